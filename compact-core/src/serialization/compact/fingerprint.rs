//! 64-bit Rabin fingerprint used to derive schema ids.
//!
//! The ids are shared with the cluster and with clients in other languages,
//! so every step here must stay bit-exact.

use super::schema::FieldDescriptor;

/// Initial value of the fingerprint and the reduction polynomial.
pub const INIT: u64 = 0xc15d_213a_a4d7_a795;

const TABLE: [u64; 256] = build_table();

const fn build_table() -> [u64; 256] {
    let mut table = [0u64; 256];
    let mut i = 0;
    while i < 256 {
        let mut fp = i as u64;
        let mut j = 0;
        while j < 8 {
            fp = (fp >> 1) ^ (INIT & (fp & 1).wrapping_neg());
            j += 1;
        }
        table[i] = fp;
        i += 1;
    }
    table
}

/// Folds a single byte into `fp`.
#[inline]
pub fn fingerprint_byte(fp: u64, b: u8) -> u64 {
    (fp >> 8) ^ TABLE[((fp ^ b as u64) & 0xff) as usize]
}

/// Folds the four bytes of `v` into `fp`, least significant byte first.
pub fn fingerprint_int(fp: u64, v: i32) -> u64 {
    v.to_le_bytes()
        .iter()
        .fold(fp, |fp, b| fingerprint_byte(fp, *b))
}

/// Folds the UTF-8 length of `s`, then its bytes, into `fp`.
pub fn fingerprint_str(fp: u64, s: &str) -> u64 {
    let fp = fingerprint_int(fp, s.len() as i32);
    fingerprint_bytes(fp, s.as_bytes())
}

/// Folds raw bytes into `fp`.
pub fn fingerprint_bytes(fp: u64, bytes: &[u8]) -> u64 {
    bytes.iter().fold(fp, |fp, b| fingerprint_byte(fp, *b))
}

/// Fingerprint of a whole buffer, starting from [`INIT`].
pub fn fingerprint_of(bytes: &[u8]) -> i64 {
    fingerprint_bytes(INIT, bytes) as i64
}

/// Computes the schema id of `type_name` with `fields` already sorted by name.
pub fn schema_id(type_name: &str, fields: &[FieldDescriptor]) -> i64 {
    let mut fp = fingerprint_str(INIT, type_name);
    fp = fingerprint_int(fp, fields.len() as i32);
    for field in fields {
        fp = fingerprint_str(fp, field.name());
        fp = fingerprint_int(fp, field.kind().id());
    }
    fp as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serialization::compact::FieldKind;

    #[test]
    fn test_table_first_entries() {
        assert_eq!(TABLE[0], 0);
        // a single set bit shifts out and pulls in the polynomial
        let mut fp = 1u64;
        for _ in 0..8 {
            fp = (fp >> 1) ^ (INIT & (fp & 1).wrapping_neg());
        }
        assert_eq!(TABLE[1], fp);
    }

    #[test]
    fn test_known_fingerprints() {
        // CRC-64-AVRO vectors: same polynomial, table and initial value
        assert_eq!(fingerprint_of(br#""null""#), 7195948357588979594);
        assert_eq!(fingerprint_of(br#""boolean""#), -6970731678124411036);
        assert_eq!(fingerprint_of(br#""int""#), 8247732601305521295);
        assert_eq!(fingerprint_of(br#""long""#), -3434872931120570953);
        assert_eq!(fingerprint_of(br#""string""#), -8142146995180207161);
    }

    #[test]
    fn test_known_schema_ids() {
        let employee = [
            FieldDescriptor::new("age", FieldKind::Int32),
            FieldDescriptor::new("id", FieldKind::Int64),
        ];
        assert_eq!(schema_id("Employee", &employee), -7162809517548041304);
        assert_eq!(schema_id("T", &[]), 1155147675219432076);
    }

    #[test]
    fn test_int_is_little_endian() {
        let by_int = fingerprint_int(INIT, 0x0102_0304);
        let by_bytes = fingerprint_bytes(INIT, &[0x04, 0x03, 0x02, 0x01]);
        assert_eq!(by_int, by_bytes);
    }

    #[test]
    fn test_str_prefixes_length() {
        let by_str = fingerprint_str(INIT, "ab");
        let by_bytes = fingerprint_bytes(INIT, &[2, 0, 0, 0, b'a', b'b']);
        assert_eq!(by_str, by_bytes);
    }

    #[test]
    fn test_schema_id_equals_fingerprint_of_little_endian_schema() {
        let fields = vec![
            FieldDescriptor::new("a", FieldKind::Boolean),
            FieldDescriptor::new("b", FieldKind::ArrayOfBoolean),
            FieldDescriptor::new("c", FieldKind::TimestampWithTimezone),
        ];

        fn put_str(buf: &mut Vec<u8>, s: &str) {
            buf.extend_from_slice(&(s.len() as i32).to_le_bytes());
            buf.extend_from_slice(s.as_bytes());
        }

        let mut buf = Vec::new();
        put_str(&mut buf, "typeName");
        buf.extend_from_slice(&3i32.to_le_bytes());
        for field in &fields {
            put_str(&mut buf, field.name());
            buf.extend_from_slice(&field.kind().id().to_le_bytes());
        }

        assert_eq!(schema_id("typeName", &fields), fingerprint_of(&buf));
    }

    #[test]
    fn test_schema_id_is_sensitive_to_names_and_kinds() {
        let base = schema_id("T", &[FieldDescriptor::new("x", FieldKind::Int32)]);
        assert_ne!(base, schema_id("T", &[FieldDescriptor::new("y", FieldKind::Int32)]));
        assert_ne!(base, schema_id("T", &[FieldDescriptor::new("x", FieldKind::Int64)]));
        assert_ne!(base, schema_id("U", &[FieldDescriptor::new("x", FieldKind::Int32)]));
        assert_eq!(base, schema_id("T", &[FieldDescriptor::new("x", FieldKind::Int32)]));
    }
}
