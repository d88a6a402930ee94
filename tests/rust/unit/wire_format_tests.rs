//! Byte-exact wire format tests.
//!
//! Every marker byte, size class boundary, and endianness choice here is
//! observable by third-party drivers; these tests pin the exact emitted
//! bytes and the minimal-size-class rule.

#[cfg(test)]
mod wire_format_tests {
    use packstream::{ByteReader, Codec, Value, ValueMap};
    use test_case::test_case;

    fn packed(value: &Value) -> Vec<u8> {
        let mut packer = Codec::v1().new_packer(Vec::new());
        packer.pack(value).unwrap();
        packer.into_inner()
    }

    fn unpacked(bytes: Vec<u8>) -> Value {
        Codec::v1()
            .new_unpacker(ByteReader::new(bytes))
            .unpack_one()
            .unwrap()
    }

    #[test_case(0, &[0x00]; "zero")]
    #[test_case(42, &[0x2A]; "tiny positive")]
    #[test_case(127, &[0x7F]; "tiny positive max")]
    #[test_case(-1, &[0xFF]; "tiny negative")]
    #[test_case(-16, &[0xF0]; "tiny negative min")]
    #[test_case(-17, &[0xC8, 0xEF]; "int8 below tiny")]
    #[test_case(-128, &[0xC8, 0x80]; "int8 min")]
    #[test_case(128, &[0xC9, 0x00, 0x80]; "int16 above int8")]
    #[test_case(200, &[0xC9, 0x00, 0xC8]; "int16 positive")]
    #[test_case(-129, &[0xC9, 0xFF, 0x7F]; "int16 below int8")]
    #[test_case(32767, &[0xC9, 0x7F, 0xFF]; "int16 max")]
    #[test_case(-32768, &[0xC9, 0x80, 0x00]; "int16 min")]
    #[test_case(32768, &[0xCA, 0x00, 0x00, 0x80, 0x00]; "int32 above int16")]
    #[test_case(-2_147_483_648, &[0xCA, 0x80, 0x00, 0x00, 0x00]; "int32 min")]
    #[test_case(2_147_483_648, &[0xCB, 0x00, 0x00, 0x00, 0x00, 0x80, 0x00, 0x00, 0x00]; "int64 above int32")]
    #[test_case(i64::MIN, &[0xCB, 0x80, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00]; "int64 min")]
    fn test_integer_size_classes(value: i64, expected: &[u8]) {
        assert_eq!(packed(&Value::Int(value)), expected);
        assert_eq!(unpacked(expected.to_vec()), Value::Int(value));
    }

    #[test]
    fn test_fixed_markers() {
        assert_eq!(packed(&Value::Null), vec![0xC0]);
        assert_eq!(packed(&Value::Bool(false)), vec![0xC2]);
        assert_eq!(packed(&Value::Bool(true)), vec![0xC3]);
    }

    #[test]
    fn test_float_is_big_endian_ieee754() {
        assert_eq!(
            packed(&Value::Float(1.0)),
            vec![0xC1, 0x3F, 0xF0, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00]
        );
        assert_eq!(
            packed(&Value::Float(-1.5)),
            vec![0xC1, 0xBF, 0xF8, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00]
        );
    }

    #[test]
    fn test_hello_string_bytes() {
        assert_eq!(
            packed(&Value::from("hello")),
            vec![0x85, 0x68, 0x65, 0x6C, 0x6C, 0x6F]
        );
    }

    #[test_case(0, 0x80, 1; "tiny empty")]
    #[test_case(15, 0x8F, 1; "tiny max")]
    #[test_case(16, 0xD0, 2; "string8 min")]
    #[test_case(255, 0xD0, 2; "string8 max")]
    #[test_case(256, 0xD1, 3; "string16 min")]
    #[test_case(65535, 0xD1, 3; "string16 max")]
    #[test_case(65536, 0xD2, 5; "string32 min")]
    fn test_string_size_classes(len: usize, marker: u8, header_len: usize) {
        let text = "a".repeat(len);
        let encoded = packed(&Value::from(text.clone()));
        assert_eq!(encoded[0], marker);
        assert_eq!(encoded.len(), header_len + len);
        assert_eq!(unpacked(encoded), Value::from(text));
    }

    #[test_case(0, 0xCC, 2; "bytes8 empty")]
    #[test_case(255, 0xCC, 2; "bytes8 max")]
    #[test_case(256, 0xCD, 3; "bytes16 min")]
    #[test_case(65536, 0xCE, 5; "bytes32 min")]
    fn test_bytes_size_classes(len: usize, marker: u8, header_len: usize) {
        let blob = vec![0xAB; len];
        let encoded = packed(&Value::Bytes(blob.clone()));
        assert_eq!(encoded[0], marker);
        assert_eq!(encoded.len(), header_len + len);
        assert_eq!(unpacked(encoded), Value::Bytes(blob));
    }

    #[test_case(0, 0x90, 1; "tiny empty")]
    #[test_case(15, 0x9F, 1; "tiny max")]
    #[test_case(16, 0xD4, 2; "list8 min")]
    #[test_case(255, 0xD4, 2; "list8 max")]
    #[test_case(256, 0xD5, 3; "list16 min")]
    #[test_case(65536, 0xD6, 5; "list32 min")]
    fn test_list_size_classes(len: usize, marker: u8, header_len: usize) {
        let list = Value::List(vec![Value::Int(0); len]);
        let encoded = packed(&list);
        assert_eq!(encoded[0], marker);
        assert_eq!(encoded.len(), header_len + len);
        assert_eq!(unpacked(encoded), list);
    }

    #[test_case(0, 0xA0; "tiny empty")]
    #[test_case(15, 0xAF; "tiny max")]
    #[test_case(16, 0xD8; "map8 min")]
    #[test_case(256, 0xD9; "map16 min")]
    fn test_map_size_classes(len: usize, marker: u8) {
        let mut map = ValueMap::with_capacity(len);
        for i in 0..len {
            map.insert(format!("k{i}"), Value::Int(i as i64));
        }
        let encoded = packed(&Value::Map(map.clone()));
        assert_eq!(encoded[0], marker);
        assert_eq!(unpacked(encoded), Value::Map(map));
    }

    #[test]
    fn test_nested_containers_emit_depth_first() {
        let mut inner = ValueMap::new();
        inner.insert("x", Value::Int(1));
        let value = Value::List(vec![
            Value::Map(inner),
            Value::List(vec![Value::from("a")]),
        ]);

        assert_eq!(
            packed(&value),
            vec![0x92, 0xA1, 0x81, 0x78, 0x01, 0x91, 0x81, 0x61]
        );
    }

    #[test]
    fn test_size_bound_rejected_before_allocation() {
        // A 4 GiB string declared over a 7-byte input must fail fast.
        let bytes = vec![0xD2, 0xFF, 0xFF, 0xFF, 0xFF, 0x61, 0x62];
        let error = Codec::v1()
            .new_unpacker(ByteReader::new(bytes))
            .unpack_one()
            .unwrap_err();
        assert!(matches!(
            error,
            packstream::PackStreamError::MalformedFormat { .. }
        ));
    }

    #[test]
    fn test_truncated_payload_is_malformed() {
        // INT_32 with two of four payload bytes.
        let error = Codec::v1()
            .new_unpacker(ByteReader::new(vec![0xCA, 0x00, 0x01]))
            .unpack_one()
            .unwrap_err();
        assert!(matches!(
            error,
            packstream::PackStreamError::MalformedFormat { .. }
        ));
    }

    #[test]
    fn test_end_of_stream_round_trip() {
        let mut packer = Codec::v1().new_packer(Vec::new());
        packer.write_end_of_stream().unwrap();
        let bytes = packer.into_inner();
        assert_eq!(bytes, vec![0xDF]);
        assert_eq!(unpacked(bytes), Value::EndOfStream);
    }
}
