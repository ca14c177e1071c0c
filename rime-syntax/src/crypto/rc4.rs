/// The RC4 stream cipher, as used by the standard security handler up to
/// revision 4.
#[derive(Clone)]
pub(crate) struct Rc4 {
    state: [u8; 256],
    i: u8,
    j: u8,
}

impl Rc4 {
    pub(crate) fn new(key: &[u8]) -> Self {
        let mut state: [u8; 256] = core::array::from_fn(|n| n as u8);

        if !key.is_empty() {
            let mut j = 0_u8;

            for (n, k) in (0..256).zip(key.iter().cycle()) {
                j = j.wrapping_add(state[n]).wrapping_add(*k);
                state.swap(n, j as usize);
            }
        }

        Self { state, i: 0, j: 0 }
    }

    fn next_key_byte(&mut self) -> u8 {
        self.i = self.i.wrapping_add(1);
        self.j = self.j.wrapping_add(self.state[self.i as usize]);
        self.state.swap(self.i as usize, self.j as usize);

        let n = self.state[self.i as usize].wrapping_add(self.state[self.j as usize]);
        self.state[n as usize]
    }

    /// Encrypt or decrypt `data`.
    pub(crate) fn apply(&mut self, data: &[u8]) -> Vec<u8> {
        data.iter().map(|b| b ^ self.next_key_byte()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::Rc4;

    fn rc4(key: &[u8], input: &[u8]) -> Vec<u8> {
        Rc4::new(key).apply(input)
    }

    #[test]
    fn known_vectors() {
        assert_eq!(rc4(b"a", &[0x68]), b"x");
        assert_eq!(rc4(b"key", &[0x7F, 0x09, 0x47, 0x99]), b"test");
        assert_eq!(rc4(b"hello", &[0x78, 0x3E, 0xCD, 0x96, 0xCF]), b"world");
        assert_eq!(rc4(b"secret", &[0x80, 0x45, 0xB5]), b"msg");
        assert_eq!(
            rc4(
                b"encryption",
                &[0x8A, 0x36, 0x3F, 0x85, 0xDB, 0x9A, 0x62, 0x7C, 0x6C, 0x56, 0x81, 0x89]
            ),
            b"Hello World!"
        );
    }

    #[test]
    fn symmetric() {
        let encrypted = rc4(b"file key", b"PDF uses RC4 for security");
        assert_eq!(rc4(b"file key", &encrypted), b"PDF uses RC4 for security");
    }
}
