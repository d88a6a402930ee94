//! Per-version type and struct gating.
//!
//! Version 1 decodes exactly the four graph structs and refuses to encode
//! the temporal and spatial family; signatures belonging to later versions
//! are reported as unsupported-here rather than unknown.

#[cfg(test)]
mod version_gating_tests {
    use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
    use packstream::{ByteReader, Codec, PackStreamError, Value, ValueWriter};
    use test_case::test_case;

    fn pack_error(value: &Value) -> (PackStreamError, Vec<u8>) {
        let mut packer = Codec::v1().new_packer(Vec::new());
        let error = packer.pack(value).unwrap_err();
        (error, packer.into_inner())
    }

    fn temporal_samples() -> Vec<Value> {
        let date = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let time = NaiveTime::from_hms_opt(12, 30, 0).unwrap();
        let offset = FixedOffset::east_opt(3600).unwrap();
        vec![
            Value::Date(date),
            Value::LocalTime(time),
            Value::Time {
                time,
                offset_seconds: 3600,
            },
            Value::LocalDateTime(NaiveDateTime::new(date, time)),
            Value::DateTime(DateTime::from_naive_utc_and_offset(
                NaiveDateTime::new(date, time),
                offset,
            )),
            Value::Duration {
                months: 1,
                days: 2,
                seconds: 3,
                nanos: 4,
            },
            Value::Point2D {
                srid: 7203,
                x: 1.0,
                y: 2.0,
            },
            Value::Point3D {
                srid: 9157,
                x: 1.0,
                y: 2.0,
                z: 3.0,
            },
        ]
    }

    #[test]
    fn test_v1_rejects_temporal_and_spatial_encoding() {
        for value in temporal_samples() {
            let (error, bytes) = pack_error(&value);
            match error {
                PackStreamError::TypeNotSupportedInThisVersion { type_name, version } => {
                    assert_eq!(type_name, value.type_name());
                    assert_eq!(version, 1);
                }
                other => panic!("expected type gating error, got {other:?}"),
            }
            assert!(bytes.is_empty(), "{} emitted bytes", value.type_name());
        }
    }

    #[test]
    fn test_temporal_nested_in_map_fails_the_whole_pack() {
        let mut map = packstream::ValueMap::new();
        map.insert("d", temporal_samples().remove(0));
        let (error, _) = pack_error(&Value::Map(map));
        assert!(matches!(
            error,
            PackStreamError::TypeNotSupportedInThisVersion { .. }
        ));
    }

    // Struct header 0xB3 plus a signature known only to newer versions.
    #[test_case(0x44; "date")]
    #[test_case(0x54; "time")]
    #[test_case(0x74; "local time")]
    #[test_case(0x64; "local date time")]
    #[test_case(0x46; "date time")]
    #[test_case(0x45; "duration")]
    #[test_case(0x58; "point 2d")]
    #[test_case(0x59; "point 3d")]
    fn test_newer_version_struct_is_unsupported_not_unknown(signature: u8) {
        let bytes = vec![0xB3, signature, 0x01, 0x02, 0x03];
        let error = Codec::v1()
            .new_unpacker(ByteReader::new(bytes))
            .unpack_one()
            .unwrap_err();
        assert!(matches!(
            error,
            PackStreamError::StructNotSupportedInThisVersion { signature: s, version: 1 }
                if s == signature
        ));
        assert_eq!(
            error.status_code(),
            "Neo.ClientError.Statement.FeatureNotSupported"
        );
    }

    #[test]
    fn test_unregistered_signature_is_unknown() {
        let error = Codec::v1()
            .new_unpacker(ByteReader::new(vec![0xB1, 0x7A, 0x01]))
            .unpack_one()
            .unwrap_err();
        assert!(matches!(
            error,
            PackStreamError::StructSignatureUnknown { signature: 0x7A }
        ));
    }

    #[test]
    fn test_reference_writes_are_refused() {
        let mut packer = Codec::v1().new_packer(Vec::new());
        for error in [
            packer.write_node_reference(1).unwrap_err(),
            packer.write_relationship_reference(2).unwrap_err(),
            packer.write_path_reference(&[1, 2], &[3]).unwrap_err(),
        ] {
            assert!(matches!(
                error,
                PackStreamError::ReferenceNotSerializable { .. }
            ));
            assert_eq!(error.status_code(), "Neo.ClientError.Statement.TypeError");
        }
        assert!(packer.into_inner().is_empty());
    }

    #[test]
    fn test_codec_reports_its_version() {
        assert_eq!(Codec::v1().version(), 1);
    }
}
