use log::warn;

pub(crate) fn decode(data: &[u8]) -> Option<Vec<u8>> {
    let mut decoded = Vec::with_capacity(data.len());
    let mut rest = data;

    while let Some((&run, tail)) = rest.split_first() {
        rest = match run {
            // EOD
            128 => return Some(decoded),
            0..=127 => {
                let count = run as usize + 1;
                let Some(literal) = tail.get(..count) else {
                    break;
                };

                decoded.extend_from_slice(literal);
                &tail[count..]
            }
            _ => {
                let Some((&byte, tail)) = tail.split_first() else {
                    break;
                };

                decoded.resize(decoded.len() + 257 - run as usize, byte);
                tail
            }
        };
    }

    warn!("run-length stream is missing its EOD marker");

    Some(decoded)
}

#[cfg(test)]
mod tests {
    use super::decode;

    #[test]
    fn literal_and_repeat_runs() {
        let input = [4, 10, 11, 12, 13, 14, 253, 3, 128];
        assert_eq!(decode(&input).unwrap(), vec![10, 11, 12, 13, 14, 3, 3, 3, 3]);
    }

    #[test]
    fn truncated_keeps_prefix() {
        assert_eq!(decode(&[1, 7]).unwrap(), Vec::<u8>::new());
        assert_eq!(decode(&[0, 7, 2, 1]).unwrap(), vec![7]);
        assert_eq!(decode(&[0, 7, 255]).unwrap(), vec![7]);
    }

    #[test]
    fn data_after_eod_is_ignored() {
        assert_eq!(decode(&[255, 9, 128, 0, 1]).unwrap(), vec![9, 9]);
    }
}
