#[derive(Debug, Clone)]
pub struct Rc4 {
    i: usize,
    j: usize,
    state: [u8; 256],
}

impl Rc4 {
    pub fn new(key: &[u8]) -> Self {
        // key scheduling
        let mut state = [0u8; 256];
        for (i, item) in state.iter_mut().enumerate() {
            *item = i as u8;
        }
        let mut j = 0usize;
        for i in 0..256 {
            j = (j + state[i] as usize + key[i % key.len()] as usize) % 256;
            state.swap(i, j);
        }

        Self { i: 0, j: 0, state }
    }

    /// Runs the keystream over `message`. The internal state advances, so
    /// consecutive calls continue the same stream.
    pub fn process(&mut self, message: &[u8]) -> Vec<u8> {
        // PRGA
        let mut output = Vec::with_capacity(message.len());
        for byte in message {
            self.i = (self.i + 1) % 256;
            self.j = (self.j + self.state[self.i] as usize) % 256;
            self.state.swap(self.i, self.j);
            let idx_k = (self.state[self.i] as usize + self.state[self.j] as usize) % 256;
            output.push(self.state[idx_k] ^ byte);
        }

        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keystream_matches_known_vector() {
        let expected = [0x66, 0x09, 0x47, 0x9E, 0x45, 0xE8, 0x1E];

        assert_eq!(Rc4::new(b"key").process(b"message")[..], expected);
    }

    #[test]
    fn single_byte_key() {
        let expected = [0xE5, 0x1A, 0xD5, 0xF3, 0xA2, 0x1C, 0xB1];

        assert_eq!(Rc4::new(b"0").process(b"message")[..], expected);
    }

    #[test]
    fn empty_message_yields_empty_output() {
        assert!(Rc4::new(b"key").process(b"").is_empty());
    }

    #[test]
    fn state_continues_across_calls() {
        let mut whole = Rc4::new(b"key");
        let mut split = Rc4::new(b"key");

        let expected = whole.process(b"messagemessage");
        let mut actual = split.process(b"message");
        actual.extend(split.process(b"message"));

        assert_eq!(expected, actual);
    }

    #[test]
    fn encrypting_twice_with_fresh_state_decrypts() {
        let encrypted = Rc4::new(b"key").process(b"plaintext");
        let decrypted = Rc4::new(b"key").process(&encrypted);

        assert_eq!(b"plaintext".to_vec(), decrypted);
    }
}
