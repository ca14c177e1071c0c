use crate::reader::is_white_space_character;

pub(crate) fn decode(data: &[u8]) -> Option<Vec<u8>> {
    let mut decoded = vec![];
    let mut group = [0_u8; 5];
    let mut len = 0;

    let symbols = data
        .iter()
        .copied()
        .filter(|b| !is_white_space_character(*b))
        .take_while(|b| *b != b'~');

    for symbol in symbols {
        match symbol {
            b'z' if len == 0 => decoded.extend_from_slice(&[0; 4]),
            0x21..=0x75 => {
                group[len] = symbol - 0x21;
                len += 1;

                if len == 5 {
                    decoded.extend_from_slice(&word(group)?);
                    len = 0;
                }
            }
            _ => return None,
        }
    }

    if len == 1 {
        return None;
    }

    if len > 0 {
        // Pad the final partial group with the highest digit.
        for d in group.iter_mut().skip(len) {
            *d = 84;
        }

        decoded.extend_from_slice(&word(group)?[..len - 1]);
    }

    Some(decoded)
}

fn word(digits: [u8; 5]) -> Option<[u8; 4]> {
    let value = digits
        .iter()
        .fold(0_u64, |acc, d| acc * 85 + *d as u64);

    // 85^5 > 256^4, the result might not fit in an u32.
    Some(u32::try_from(value).ok()?.to_be_bytes())
}
