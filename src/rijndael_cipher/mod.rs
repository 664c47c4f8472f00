
pub mod rijndael {
    use galois_2p8::{GeneralField, IrreducablePolynomial};
    use galois_2p8::Field;

    use std::fmt;
    use std::marker::PhantomData;

    use byteorder::{BigEndian, ByteOrder};

    use cipher::block::{BlockCipher, NewBlockCipher, Key};
    use cipher::consts::{U16, U24, U32, U1};
    use cipher::block::Block;
    use cipher::generic_array::ArrayLength;

    pub const STATE_SIZE: usize = 16;

    const ROW_SIZE: usize = 4;

    const AFFINE_CONSTANT: u8 = 0x63;

    // Circulant coefficients of MixColumns and InvMixColumns
    const MIX_POLYNOMIAL: [u8; ROW_SIZE] = [0x02, 0x03, 0x01, 0x01];
    const INV_MIX_POLYNOMIAL: [u8; ROW_SIZE] = [0x0e, 0x0b, 0x0d, 0x09];

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Action {
        XOR,
        Scramble,
        Linear,
        SBox
    }

    /// Key length marker, fixes the key size and the number of rounds.
    pub trait KeyLength {
        type KeySize: ArrayLength<u8>;

        /// Number of 32-bit words in the cipher key (Nk)
        const WORDS: usize;

        fn rounds() -> usize {
            Self::WORDS + 6
        }
    }

    pub struct Bits128;
    pub struct Bits192;
    pub struct Bits256;

    impl KeyLength for Bits128 {
        type KeySize = U16;
        const WORDS: usize = 4;
    }

    impl KeyLength for Bits192 {
        type KeySize = U24;
        const WORDS: usize = 6;
    }

    impl KeyLength for Bits256 {
        type KeySize = U32;
        const WORDS: usize = 8;
    }

    pub trait SBox {
        fn forward(&self, byte: u8) -> u8;

        fn reverse(&self, byte: u8) -> u8;
    }

    /// The Rijndael S-box, computed once from the field instead of hard coded.
    pub struct RijndaelSbox {
        _forward: [u8; 256],
        _reverse: [u8; 256]
    }

    impl RijndaelSbox {
        pub fn new(field: & GeneralField) -> Self {
            let mut forward = [0u8; 256];

            for (i, element) in forward.iter_mut().enumerate() {
                let byte = i as u8;

                let mul_inv = if byte == 0 {
                    0
                }
                else {
                    field.div(1, byte)
                };

                // Affine transformation over GF(2)
                *element = mul_inv ^
                    mul_inv.rotate_left(1) ^
                    mul_inv.rotate_left(2) ^
                    mul_inv.rotate_left(3) ^
                    mul_inv.rotate_left(4) ^
                    AFFINE_CONSTANT;
            }

            let mut reverse = [0u8; 256];

            for (i, map_element) in forward.iter().enumerate() {
                reverse[*map_element as usize] = i as u8;
            }

            RijndaelSbox {
                _forward: forward,
                _reverse: reverse
            }
        }
    }

    impl SBox for RijndaelSbox {

        fn forward(&self, byte: u8) -> u8 {
            self._forward[byte as usize]
        }

        fn reverse(&self, byte: u8) -> u8 {
            self._reverse[byte as usize]
        }
    }

    /// Multiplication tables for each coefficient of a circulant polynomial.
    struct Polynomial {
        _tables: [[u8; 256]; ROW_SIZE]
    }

    impl Polynomial {
        fn new(field: & GeneralField, coefficients: & [u8; ROW_SIZE]) -> Self {
            let mut tables = [[0u8; 256]; ROW_SIZE];

            for (table, coefficient) in tables.iter_mut().zip(coefficients.iter()) {
                for (i, element) in table.iter_mut().enumerate() {
                    *element = field.mult(*coefficient, i as u8);
                }
            }

            Polynomial {
                _tables: tables
            }
        }

        fn mult(&self, coefficient: usize, byte: u8) -> u8 {
            self._tables[coefficient][byte as usize]
        }
    }

    struct State<'a> {
        _array: & 'a mut [u8]
    }

    impl fmt::Debug for State<'_> {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.debug_struct("State")
                .field("_array", &self._array)
                .finish()
        }
    }

    impl<'a> State<'a> {
        fn new(array: & 'a mut [u8]) -> Self {
            State {
                _array: array
            }
        }

        fn xor(& mut self, key: & [u8]) {
            for (state_byte, key_byte) in self._array.iter_mut().zip(key.iter()) {
                *state_byte ^= *key_byte;
            }
        }

        fn scramble(& mut self, permutation: & [usize; STATE_SIZE]) {
            let mut tmp = [0; STATE_SIZE];

            for (tmp_byte, permuter) in tmp.iter_mut().zip(permutation.iter()) {
                *tmp_byte = self._array[*permuter]
            }

            self._array.clone_from_slice(&tmp);
        }

        // The state is stored column by column, so each run of four bytes is one column
        fn linear(& mut self, polynomial: & Polynomial) {
            for i in 0..(STATE_SIZE / ROW_SIZE) {
                let column = & mut self._array[i*ROW_SIZE..i*ROW_SIZE+ROW_SIZE];

                let mut new_column = [0u8; ROW_SIZE];

                for (j, new_column_element) in new_column.iter_mut().enumerate() {

                    for (k, column_element) in column.iter().enumerate() {
                        //Row j of a circulant matrix is the polynomial rotated right by j
                        *new_column_element ^= polynomial.mult((k + ROW_SIZE - j) % ROW_SIZE, *column_element);
                    }
                }

                column.clone_from_slice(&new_column);
            }
        }

        fn remap<F>(& mut self, sbox: &F)
            where F: Fn(u8) -> u8
        {
            for byte in self._array.iter_mut() {
                *byte = sbox(*byte)
            }
        }

        fn transform<'k, K, F>(& mut self,
                        sequence: & [Action],
                        mut round_keys: K,
                        polynomial: & Polynomial,
                        permutation: & [usize; STATE_SIZE],
                        sbox: F)
            where K: Iterator<Item = & 'k [u8; STATE_SIZE]>,
                  F: Fn(u8) -> u8
        {

            for action in sequence.iter() {
                match action {
                    Action::XOR => {
                        if let Some(key) = round_keys.next() {
                            self.xor(key);
                        }
                    },
                    Action::Linear => {
                        self.linear(polynomial);
                    },
                    Action::SBox => {
                        self.remap(&sbox);
                    },
                    Action::Scramble => {
                        self.scramble(permutation);
                    }
                }
            }
        }
    }

    // ShiftRows as a permutation of the column-major state: byte (row, col) comes from (row, col + row)
    fn shift_rows_permutation() -> [usize; STATE_SIZE] {
        let mut permutation = [0; STATE_SIZE];

        for (i, element) in permutation.iter_mut().enumerate() {
            let row = i % ROW_SIZE;
            let column = i / ROW_SIZE;

            *element = ((column + row) % ROW_SIZE) * ROW_SIZE + row;
        }

        permutation
    }

    fn invert_map(map: & [usize]) -> [usize; STATE_SIZE] {
        let mut inverted = [0; STATE_SIZE];

        for (i, map_element) in map.iter().enumerate() {
            inverted[*map_element] = i;
        }

        inverted
    }

    /*
        Initial AddRoundKey, then Nr-1 full rounds of SubBytes, ShiftRows, MixColumns and AddRoundKey,
        then a final round without MixColumns. Reversing this sequence and swapping each action
        for its inverse gives the straightforward inverse cipher.
    */
    fn round_sequence(rounds: usize) -> Vec<Action> {
        let mut sequence = vec![Action::XOR];

        for _ in 1..rounds {
            sequence.extend_from_slice(&[Action::SBox, Action::Scramble, Action::Linear, Action::XOR]);
        }

        sequence.extend_from_slice(&[Action::SBox, Action::Scramble, Action::XOR]);

        sequence
    }

    fn sub_word(sbox: & RijndaelSbox, word: u32) -> u32 {
        let mut bytes = [0u8; 4];

        BigEndian::write_u32(& mut bytes, word);

        for byte in bytes.iter_mut() {
            *byte = sbox.forward(*byte);
        }

        BigEndian::read_u32(&bytes)
    }

    fn expand_key(field: & GeneralField, sbox: & RijndaelSbox, key: & [u8], words: usize, rounds: usize) -> Vec<[u8; STATE_SIZE]> {
        let total = ROW_SIZE * (rounds + 1);

        let mut schedule: Vec<u32> = key.chunks(4).map(BigEndian::read_u32).collect();

        let mut rcon = 1u8;

        for i in words..total {
            let mut temp = schedule[i - 1];

            if i % words == 0 {
                temp = sub_word(sbox, temp.rotate_left(8)) ^ ((rcon as u32) << 24);
                rcon = field.mult(rcon, 2);
            }
            else if words > 6 && i % words == 4 {
                temp = sub_word(sbox, temp);
            }

            schedule.push(schedule[i - words] ^ temp);
        }

        schedule.chunks(ROW_SIZE).map(|round| {
            let mut round_key = [0u8; STATE_SIZE];

            BigEndian::write_u32_into(round, & mut round_key);

            round_key
        }).collect()
    }

    /// Software Rijndael with a 128-bit block, usable with any `block_modes` mode.
    pub struct Rijndael<K: KeyLength>
    {
        _sbox: RijndaelSbox,

        _round_keys: Vec<[u8; STATE_SIZE]>,

        _polynomial: Polynomial,
        _permutation: [usize; STATE_SIZE],
        _sequence: Vec<Action>,

        _inv_polynomial: Polynomial,
        _inv_permutation: [usize; STATE_SIZE],
        _rev_sequence: Vec<Action>,

        _length: PhantomData<K>
    }

    #[cfg(test)]
    impl<K: KeyLength> Rijndael<K> {
        pub fn rounds(&self) -> usize {
            self._round_keys.len() - 1
        }
    }

    impl<K: KeyLength> NewBlockCipher for Rijndael<K> {
        type KeySize = K::KeySize;

        fn new(key: & Key<Self>) -> Self {

            //All cipher arithmetic is performed over GF(2^8) modulo x^8 + x^4 + x^3 + x + 1
            let field = GeneralField::new(IrreducablePolynomial::Poly84310);

            let sbox = RijndaelSbox::new(&field);

            let round_keys = expand_key(&field, &sbox, key.as_slice(), K::WORDS, K::rounds());

            let sequence = round_sequence(K::rounds());
            let permutation = shift_rows_permutation();

            /* Calculate the inverse of all the actions */
            let inverse_perm = invert_map(& permutation);
            let reverse_sequ = sequence.iter().rev().copied().collect();

            Rijndael {
                _sbox: sbox,

                _round_keys: round_keys,

                _polynomial: Polynomial::new(&field, &MIX_POLYNOMIAL),
                _permutation: permutation,
                _sequence: sequence,

                _inv_polynomial: Polynomial::new(&field, &INV_MIX_POLYNOMIAL),
                _inv_permutation: inverse_perm,
                _rev_sequence: reverse_sequ,

                _length: PhantomData
            }
        }

    }

    impl<K: KeyLength> BlockCipher for Rijndael<K> {
        type BlockSize = U16;
        type ParBlocks = U1;

        fn encrypt_block(&self, block: &mut Block<Self>) {
            let mut state = State::new(block.as_mut_slice());

            state.transform(&self._sequence, self._round_keys.iter(), &self._polynomial, &self._permutation, |x| self._sbox.forward(x));
        }

        fn decrypt_block(&self, block: &mut Block<Self>) {
            let mut state = State::new(block.as_mut_slice());

            state.transform(&self._rev_sequence, self._round_keys.iter().rev(), &self._inv_polynomial, &self._inv_permutation, |x| self._sbox.reverse(x));
        }


    }

    pub type Rijndael128 = Rijndael<Bits128>;
    pub type Rijndael192 = Rijndael<Bits192>;
    pub type Rijndael256 = Rijndael<Bits256>;
}

#[cfg(test)]
mod tests {
    use super::rijndael::*;

    use cipher::block::{BlockCipher, NewBlockCipher, Block, Key};
    use galois_2p8::{GeneralField, IrreducablePolynomial};
    use hex_literal::hex;

    const PLAINTEXT: [u8; 16] = hex!("00112233445566778899aabbccddeeff");

    // No fixed points, no opposite fixed points, and the reverse table undoes the forward one
    fn is_valid<S: SBox>(sbox: &S) -> bool {
        (0..=255u8).all(|byte| {
            let mapped = sbox.forward(byte);

            mapped != byte && mapped != !byte && sbox.reverse(mapped) == byte
        })
    }

    fn check_vector<C: BlockCipher + NewBlockCipher>(key: &[u8], expected: [u8; 16]) {
        let cipher = C::new(Key::<C>::from_slice(key));

        let mut block = Block::<C>::clone_from_slice(&PLAINTEXT);

        cipher.encrypt_block(&mut block);
        assert_eq!(block.as_slice(), &expected[..]);

        cipher.decrypt_block(&mut block);
        assert_eq!(block.as_slice(), &PLAINTEXT[..]);
    }

    #[test]
    fn sbox_matches_published_table() {
        let sbox = RijndaelSbox::new(&GeneralField::new(IrreducablePolynomial::Poly84310));

        assert_eq!(sbox.forward(0x00), 0x63);
        assert_eq!(sbox.forward(0x53), 0xed);
        assert_eq!(sbox.forward(0xff), 0x16);
        assert_eq!(sbox.reverse(0x63), 0x00);
        assert!(is_valid(&sbox));
    }

    #[test]
    fn fips197_128() {
        check_vector::<Rijndael128>(
            &hex!("000102030405060708090a0b0c0d0e0f"),
            hex!("69c4e0d86a7b0430d8cdb78070b4c55a"),
        );
    }

    #[test]
    fn fips197_192() {
        check_vector::<Rijndael192>(
            &hex!("000102030405060708090a0b0c0d0e0f1011121314151617"),
            hex!("dda97ca4864cdfe06eaf70a0ec0d7191"),
        );
    }

    #[test]
    fn fips197_256() {
        check_vector::<Rijndael256>(
            &hex!("000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f"),
            hex!("8ea2b7ca516745bfeafc49904b496089"),
        );
    }

    #[test]
    fn round_counts() {
        let key = [0u8; 32];

        assert_eq!(Rijndael128::new(Key::<Rijndael128>::from_slice(&key[..16])).rounds(), 10);
        assert_eq!(Rijndael192::new(Key::<Rijndael192>::from_slice(&key[..24])).rounds(), 12);
        assert_eq!(Rijndael256::new(Key::<Rijndael256>::from_slice(&key)).rounds(), 14);
    }

    #[test]
    fn agrees_with_aes_crate() {
        let key = hex!("2b7e151628aed2a6abf7158809cf4f3c");
        let ours = Rijndael128::new(Key::<Rijndael128>::from_slice(&key));
        let theirs = aes::Aes128::new(Key::<aes::Aes128>::from_slice(&key));

        for seed in 0u8..32 {
            let data: Vec<u8> = (0..16u8).map(|i| i.wrapping_mul(37).wrapping_add(seed)).collect();

            let mut a = Block::<Rijndael128>::clone_from_slice(&data);
            let mut b = Block::<aes::Aes128>::clone_from_slice(&data);

            ours.encrypt_block(&mut a);
            theirs.encrypt_block(&mut b);

            assert_eq!(a.as_slice(), b.as_slice());
        }
    }
}
