use crate::reader::{Reader, is_white_space_character};

pub(crate) fn decode(data: &[u8]) -> Option<Vec<u8>> {
    let mut reader = Reader::new(data);
    let mut digits = Vec::with_capacity(data.len());

    while let Some(byte) = reader.read_byte() {
        match byte {
            b'>' => break,
            b if b.is_ascii_hexdigit() => digits.push(b),
            b if is_white_space_character(b) => {}
            _ => return None,
        }
    }

    Some(
        digits
            .chunks(2)
            .map(|pair| val(pair[0]) << 4 | val(*pair.get(1).unwrap_or(&b'0')))
            .collect(),
    )
}

fn val(c: u8) -> u8 {
    match c {
        b'A'..=b'F' => c - b'A' + 10,
        b'a'..=b'f' => c - b'a' + 10,
        _ => c - b'0',
    }
}
