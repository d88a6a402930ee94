//! Whole-value roundtrips through the version 1 codec.

#[cfg(test)]
mod roundtrip_tests {
    use packstream::{
        ByteReader, Codec, Node, Path, Relationship, UnboundRelationship, Value, ValueMap,
    };

    fn roundtrip(value: &Value) -> Value {
        let codec = Codec::v1();
        let mut packer = codec.new_packer(Vec::new());
        packer.pack(value).unwrap();
        let mut unpacker = codec.new_unpacker(ByteReader::new(packer.into_inner()));
        unpacker.unpack_one().unwrap()
    }

    fn assert_roundtrip(value: Value) {
        assert_eq!(roundtrip(&value), value);
    }

    #[test]
    fn test_primitive_roundtrips() {
        assert_roundtrip(Value::Null);
        assert_roundtrip(Value::Bool(true));
        assert_roundtrip(Value::Bool(false));
        for i in [
            0i64,
            1,
            -1,
            -16,
            -17,
            127,
            128,
            -128,
            -129,
            32767,
            32768,
            -32768,
            -32769,
            i64::from(i32::MAX),
            i64::from(i32::MIN),
            i64::from(i32::MAX) + 1,
            i64::MAX,
            i64::MIN,
        ] {
            assert_roundtrip(Value::Int(i));
        }
        for f in [0.0, -0.0, 1.5, -1.5, f64::MAX, f64::MIN_POSITIVE, f64::INFINITY] {
            assert_roundtrip(Value::Float(f));
        }
        assert_roundtrip(Value::from("grapheme: café"));
        assert_roundtrip(Value::Bytes(vec![0x00, 0xFF, 0x7F]));
    }

    #[test]
    fn test_container_roundtrips() {
        assert_roundtrip(Value::List(vec![]));
        assert_roundtrip(Value::List(vec![
            Value::Int(1),
            Value::from("two"),
            Value::List(vec![Value::Null]),
        ]));

        let mut inner = ValueMap::new();
        inner.insert("nested", Value::Bool(true));
        let mut map = ValueMap::new();
        map.insert("a", Value::Int(1));
        map.insert("b", Value::Map(inner));
        map.insert("c", Value::List(vec![Value::Float(2.5)]));
        assert_roundtrip(Value::Map(map));
    }

    #[test]
    fn test_map_order_survives_but_does_not_affect_equality() {
        let mut forward = ValueMap::new();
        forward.insert("first", Value::Int(1));
        forward.insert("second", Value::Int(2));

        match roundtrip(&Value::Map(forward.clone())) {
            Value::Map(decoded) => {
                let keys: Vec<&str> = decoded.keys().collect();
                assert_eq!(keys, vec!["first", "second"]);

                let mut reversed = ValueMap::new();
                reversed.insert("second", Value::Int(2));
                reversed.insert("first", Value::Int(1));
                assert_eq!(decoded, reversed);
            }
            other => panic!("expected a map, got {other:?}"),
        }
    }

    fn sample_node(id: i64) -> Node {
        let mut properties = ValueMap::new();
        properties.insert("name", Value::from(format!("node-{id}")));
        properties.insert("weight", Value::Float(id as f64 / 2.0));
        Node::new(id, vec!["Person".to_string(), "User".to_string()], properties)
    }

    #[test]
    fn test_entity_roundtrips() {
        assert_roundtrip(Value::Node(sample_node(7)));

        let mut properties = ValueMap::new();
        properties.insert("since", Value::Int(2019));
        assert_roundtrip(Value::Relationship(Relationship::new(
            3,
            1,
            2,
            "KNOWS".to_string(),
            properties.clone(),
        )));

        assert_roundtrip(Value::UnboundRelationship(UnboundRelationship::new(
            9,
            "LIKES".to_string(),
            properties,
        )));
    }

    #[test]
    fn test_single_node_path_roundtrip() {
        assert_roundtrip(Value::Path(Path::singular(sample_node(1))));
    }

    #[test]
    fn test_forward_and_backward_path_roundtrip() {
        let a = sample_node(1);
        let b = sample_node(2);
        let r = Relationship::new(10, 1, 2, "T".to_string(), ValueMap::new());
        let s = Relationship::new(11, 1, 2, "T".to_string(), ValueMap::new());
        // (a)-[r]->(b) then (b)<-[s]-(a): second step runs against s.
        let path = Path::new(vec![a.clone(), b, a], vec![r, s]);
        assert_roundtrip(Value::Path(path));
    }

    #[test]
    fn test_revisiting_path_roundtrip() {
        // (a)-[r]->(b)<-[r]-(a): both entities repeat in the traversal.
        let a = sample_node(1);
        let b = sample_node(2);
        let r = Relationship::new(10, 1, 2, "T".to_string(), ValueMap::new());
        let path = Path::new(vec![a.clone(), b, a], vec![r.clone(), r]);
        assert_roundtrip(Value::Path(path));
    }

    #[test]
    fn test_long_chain_path_roundtrip() {
        // Enough distinct entities to push the packer's scratch maps past
        // their linear-scan phase.
        let nodes: Vec<Node> = (0..60).map(sample_node).collect();
        let relationships: Vec<Relationship> = (0..59)
            .map(|i| {
                Relationship::new(1000 + i, i, i + 1, "NEXT".to_string(), ValueMap::new())
            })
            .collect();
        let path = Path::new(nodes, relationships);
        assert_roundtrip(Value::Path(path));
    }

    #[test]
    fn test_path_nested_in_record_list() {
        let path = Path::singular(sample_node(4));
        let record = Value::List(vec![Value::Path(path), Value::Int(1)]);
        assert_roundtrip(record);
    }
}
