use std::fmt;

use block_modes::block_padding::Pkcs7;
use block_modes::{BlockMode, BlockModeError, Cbc};
use cipher::block::{BlockCipher, NewBlockCipher};
use hex_literal::hex;
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaChaRng;

use crate::error::{BenchError, Result};
use crate::rijndael_cipher::rijndael::{Rijndael128, Rijndael192, Rijndael256};

const DES_KEY_LEN: usize = 8;

// Weak and semi-weak DES keys, parity adjusted
const DES_WEAK_KEYS: [[u8; DES_KEY_LEN]; 16] = [
    hex!("0101010101010101"),
    hex!("fefefefefefefefe"),
    hex!("e0e0e0e0f1f1f1f1"),
    hex!("1f1f1f1f0e0e0e0e"),
    hex!("01fe01fe01fe01fe"),
    hex!("fe01fe01fe01fe01"),
    hex!("1fe01fe00ef10ef1"),
    hex!("e01fe01ff10ef10e"),
    hex!("01e001e001f101f1"),
    hex!("e001e001f101f101"),
    hex!("1ffe1ffe0efe0efe"),
    hex!("fe1ffe1ffe0efe0e"),
    hex!("011f011f010e010e"),
    hex!("1f011f010e010e01"),
    hex!("e0fee0fef1fef1fe"),
    hex!("fee0fee0fef1fef1"),
];

/// Closed set of benchmarked implementations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CipherFamily {
    /// Platform AES provider (`aes` on its AES-NI backend, see `.cargo/config.toml`)
    AesCsp,
    /// Pure software AES (`aes-soft`)
    AesManaged,
    /// In-crate table driven Rijndael
    RijndaelManaged,
    Des,
    TripleDes,
}

impl fmt::Display for CipherFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CipherFamily::AesCsp => "AES(CSP)",
            CipherFamily::AesManaged => "AES Managed",
            CipherFamily::RijndaelManaged => "Rijndael Managed",
            CipherFamily::Des => "DES",
            CipherFamily::TripleDes => "3DES",
        };
        f.write_str(name)
    }
}

impl CipherFamily {
    pub fn legal_key_sizes(self) -> &'static [usize] {
        match self {
            CipherFamily::AesCsp | CipherFamily::AesManaged | CipherFamily::RijndaelManaged => {
                &[128, 192, 256]
            }
            CipherFamily::Des => &[64],
            CipherFamily::TripleDes => &[128, 192],
        }
    }

    pub fn default_key_size(self) -> usize {
        match self {
            CipherFamily::AesCsp | CipherFamily::AesManaged | CipherFamily::RijndaelManaged => 256,
            CipherFamily::Des => 64,
            CipherFamily::TripleDes => 192,
        }
    }

    /// Block size in bytes, also the IV length.
    pub fn block_size(self) -> usize {
        match self {
            CipherFamily::Des | CipherFamily::TripleDes => 8,
            _ => 16,
        }
    }

    /// Picks the key size a cipher row runs with. Only an explicitly requested size is validated,
    /// otherwise the family default applies whatever the nominal size is.
    pub fn resolve_key_size(self, requested: usize, explicit: bool) -> Result<usize> {
        if !explicit {
            return Ok(self.default_key_size());
        }

        if self.legal_key_sizes().contains(&requested) {
            Ok(requested)
        } else {
            Err(BenchError::UnsupportedKeySize {
                family: self,
                bits: requested,
            })
        }
    }

    pub fn generate_key<R: RngCore>(self, bits: usize, rng: &mut R) -> Vec<u8> {
        let mut key = vec![0u8; bits / 8];

        loop {
            rng.fill_bytes(&mut key);

            match self {
                CipherFamily::Des | CipherFamily::TripleDes => set_odd_parity(&mut key),
                _ => return key,
            }

            if !self.is_weak_key(&key) {
                return key;
            }
        }
    }

    pub fn generate_iv<R: RngCore>(self, rng: &mut R) -> Vec<u8> {
        let mut iv = vec![0u8; self.block_size()];
        rng.fill_bytes(&mut iv);
        iv
    }

    pub fn is_weak_key(self, key: &[u8]) -> bool {
        match self {
            CipherFamily::Des => DES_WEAK_KEYS.iter().any(|weak| weak[..] == *key),
            CipherFamily::TripleDes => {
                let parts: Vec<&[u8]> = key.chunks(DES_KEY_LEN).collect();
                parts.windows(2).any(|pair| pair[0] == pair[1])
            }
            _ => false,
        }
    }

    /// Builds a CBC/PKCS#7 transform for the key material. Key scheduling happens here,
    /// so callers can keep it out of any timed section.
    pub fn transform(self, material: &KeyMaterial) -> Result<Box<dyn CbcTransform>> {
        let key = &material.key;
        let iv = &material.iv;

        match (self, key.len()) {
            (CipherFamily::AesCsp, 16) => cbc::<aes::Aes128>(self, key, iv),
            (CipherFamily::AesCsp, 24) => cbc::<aes::Aes192>(self, key, iv),
            (CipherFamily::AesCsp, 32) => cbc::<aes::Aes256>(self, key, iv),
            (CipherFamily::AesManaged, 16) => cbc::<aes_soft::Aes128>(self, key, iv),
            (CipherFamily::AesManaged, 24) => cbc::<aes_soft::Aes192>(self, key, iv),
            (CipherFamily::AesManaged, 32) => cbc::<aes_soft::Aes256>(self, key, iv),
            (CipherFamily::RijndaelManaged, 16) => cbc::<Rijndael128>(self, key, iv),
            (CipherFamily::RijndaelManaged, 24) => cbc::<Rijndael192>(self, key, iv),
            (CipherFamily::RijndaelManaged, 32) => cbc::<Rijndael256>(self, key, iv),
            (CipherFamily::Des, 8) => cbc::<des::Des>(self, key, iv),
            (CipherFamily::TripleDes, 16) => cbc::<des::TdesEde2>(self, key, iv),
            (CipherFamily::TripleDes, 24) => cbc::<des::TdesEde3>(self, key, iv),
            (family, len) => Err(BenchError::UnsupportedKeySize {
                family,
                bits: len * 8,
            }),
        }
    }

    pub fn transform_failure<E: fmt::Display>(self, reason: E) -> BenchError {
        BenchError::TransformFailure {
            algorithm: self.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Single-shot full buffer transform. Consumes the mode, it is good for one call.
pub trait CbcTransform {
    fn encrypt(self: Box<Self>, plaintext: &[u8]) -> Vec<u8>;

    fn decrypt(self: Box<Self>, ciphertext: &[u8]) -> std::result::Result<Vec<u8>, BlockModeError>;
}

impl<C> CbcTransform for Cbc<C, Pkcs7>
where
    C: BlockCipher + NewBlockCipher,
{
    fn encrypt(self: Box<Self>, plaintext: &[u8]) -> Vec<u8> {
        (*self).encrypt_vec(plaintext)
    }

    fn decrypt(self: Box<Self>, ciphertext: &[u8]) -> std::result::Result<Vec<u8>, BlockModeError> {
        (*self).decrypt_vec(ciphertext)
    }
}

fn cbc<C>(family: CipherFamily, key: &[u8], iv: &[u8]) -> Result<Box<dyn CbcTransform>>
where
    C: BlockCipher + NewBlockCipher + 'static,
{
    let mode = Cbc::<C, Pkcs7>::new_var(key, iv).map_err(|e| family.transform_failure(e))?;

    Ok(Box::new(mode))
}

fn set_odd_parity(key: &mut [u8]) {
    for byte in key.iter_mut() {
        let high = *byte & 0xfe;
        *byte = high | ((high.count_ones() as u8 + 1) & 1);
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct KeyMaterial {
    pub key: Vec<u8>,
    pub iv: Vec<u8>,
}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyMaterial")
            .field("key_bits", &(self.key.len() * 8))
            .field("iv", &hex::encode(&self.iv))
            .finish()
    }
}

/// One benchmarked row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CipherSpec {
    pub name: &'static str,
    pub family: CipherFamily,
    pub key_size: usize,
    pub set_key_size: bool,
}

impl CipherSpec {
    pub const fn new(name: &'static str, family: CipherFamily, key_size: usize) -> Self {
        CipherSpec {
            name,
            family,
            key_size,
            set_key_size: true,
        }
    }

    /// The key size is only a label, the family picks its default.
    pub const fn with_default_key_size(
        name: &'static str,
        family: CipherFamily,
        key_size: usize,
    ) -> Self {
        CipherSpec {
            name,
            family,
            key_size,
            set_key_size: false,
        }
    }

    pub fn key_material(&self) -> Result<KeyMaterial> {
        let bits = self.family.resolve_key_size(self.key_size, self.set_key_size)?;
        let mut rng = ChaChaRng::from_entropy();

        Ok(KeyMaterial {
            key: self.family.generate_key(bits, &mut rng),
            iv: self.family.generate_iv(&mut rng),
        })
    }
}

pub const DEFAULT_SUITE: [CipherSpec; 8] = [
    CipherSpec::new("AES(CSP) 128-bit", CipherFamily::AesCsp, 128),
    CipherSpec::new("AES(CSP) 256-bit", CipherFamily::AesCsp, 256),
    CipherSpec::new("AES Managed 128-bit", CipherFamily::AesManaged, 128),
    CipherSpec::new("AES Managed 256-bit", CipherFamily::AesManaged, 256),
    CipherSpec::new("Rijndael Managed 128-bit", CipherFamily::RijndaelManaged, 128),
    CipherSpec::new("Rijndael Managed 256-bit", CipherFamily::RijndaelManaged, 256),
    CipherSpec::with_default_key_size("DES 56-bit", CipherFamily::Des, 56),
    CipherSpec::with_default_key_size("3DES 168-bit", CipherFamily::TripleDes, 168),
];

#[cfg(test)]
mod tests {
    use super::*;

    use rand_chacha::ChaCha8Rng;

    const ALL_FAMILIES: [CipherFamily; 5] = [
        CipherFamily::AesCsp,
        CipherFamily::AesManaged,
        CipherFamily::RijndaelManaged,
        CipherFamily::Des,
        CipherFamily::TripleDes,
    ];

    impl CipherFamily {
        fn encrypt(self, material: &KeyMaterial, plaintext: &[u8]) -> Result<Vec<u8>> {
            Ok(self.transform(material)?.encrypt(plaintext))
        }

        fn decrypt(self, material: &KeyMaterial, ciphertext: &[u8]) -> Result<Vec<u8>> {
            self.transform(material)?
                .decrypt(ciphertext)
                .map_err(|e| self.transform_failure(e))
        }
    }

    fn sample(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i * 31 + 7) as u8).collect()
    }

    #[test]
    fn round_trip_every_family_and_key_size() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);

        for family in ALL_FAMILIES.iter().copied() {
            for bits in family.legal_key_sizes() {
                let material = KeyMaterial {
                    key: family.generate_key(*bits, &mut rng),
                    iv: family.generate_iv(&mut rng),
                };

                for len in [0, 1, 15, 16, 17, 1000].iter().copied() {
                    let plaintext = sample(len);
                    let ciphertext = family.encrypt(&material, &plaintext).unwrap();

                    assert!(ciphertext.len() > plaintext.len(), "{} {}", family, bits);
                    assert_eq!(ciphertext.len() % family.block_size(), 0);
                    assert_eq!(family.decrypt(&material, &ciphertext).unwrap(), plaintext);
                }
            }
        }
    }

    #[test]
    fn aes128_zero_key_single_block() {
        let material = KeyMaterial {
            key: vec![0u8; 16],
            iv: vec![0u8; 16],
        };
        let plaintext = sample(16);

        let ciphertext = CipherFamily::AesCsp.encrypt(&material, &plaintext).unwrap();
        assert_eq!(ciphertext.len(), 32);

        let decrypted = CipherFamily::AesCsp.decrypt(&material, &ciphertext).unwrap();
        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn implementations_agree() {
        let material = KeyMaterial {
            key: hex!("603deb1015ca71be2b73aef0857d77811f352c073b6108d72d9810a30914dff4").to_vec(),
            iv: hex!("000102030405060708090a0b0c0d0e0f").to_vec(),
        };
        let plaintext = sample(4096);

        let csp = CipherFamily::AesCsp.encrypt(&material, &plaintext).unwrap();
        let managed = CipherFamily::AesManaged.encrypt(&material, &plaintext).unwrap();
        let rijndael = CipherFamily::RijndaelManaged.encrypt(&material, &plaintext).unwrap();

        assert_eq!(csp, managed);
        assert_eq!(csp, rijndael);
    }

    #[test]
    fn des_without_explicit_size_uses_default() {
        let spec = DEFAULT_SUITE[6];
        assert_eq!(spec.family, CipherFamily::Des);

        let material = spec.key_material().unwrap();
        assert_eq!(material.key.len(), 8);
        assert_eq!(material.iv.len(), 8);
    }

    #[test]
    fn explicit_des_56_is_rejected() {
        let spec = CipherSpec::new("DES 56-bit", CipherFamily::Des, 56);

        match spec.key_material() {
            Err(BenchError::UnsupportedKeySize { family, bits }) => {
                assert_eq!(family, CipherFamily::Des);
                assert_eq!(bits, 56);
            }
            other => panic!("expected UnsupportedKeySize, got {:?}", other),
        }
    }

    #[test]
    fn triple_des_default_is_three_key() {
        let material = DEFAULT_SUITE[7].key_material().unwrap();

        assert_eq!(material.key.len(), 24);
        assert!(!CipherFamily::TripleDes.is_weak_key(&material.key));
    }

    #[test]
    fn des_keys_have_odd_parity_and_are_strong() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);

        for _ in 0..256 {
            let key = CipherFamily::Des.generate_key(64, &mut rng);

            assert!(key.iter().all(|b| b.count_ones() % 2 == 1));
            assert!(!CipherFamily::Des.is_weak_key(&key));
        }
    }

    #[test]
    fn weak_keys_are_detected() {
        assert!(CipherFamily::Des.is_weak_key(&hex!("0101010101010101")));
        assert!(CipherFamily::Des.is_weak_key(&hex!("01fe01fe01fe01fe")));
        assert!(!CipherFamily::Des.is_weak_key(&hex!("133457799bbcdff1")));

        let degenerate = hex!("0123456789abcdef0123456789abcdef89abcdef01234567");
        assert!(CipherFamily::TripleDes.is_weak_key(&degenerate));
    }

    #[test]
    fn bad_ciphertext_is_a_transform_failure() {
        let material = KeyMaterial {
            key: vec![1u8; 16],
            iv: vec![2u8; 16],
        };

        let result = CipherFamily::AesManaged.decrypt(&material, &[0u8; 15]);
        assert!(matches!(result, Err(BenchError::TransformFailure { .. })));
    }

    #[test]
    fn mismatched_key_length_is_rejected() {
        let material = KeyMaterial {
            key: vec![0u8; 20],
            iv: vec![0u8; 16],
        };

        assert!(matches!(
            CipherFamily::AesCsp.transform(&material),
            Err(BenchError::UnsupportedKeySize { bits: 160, .. })
        ));
    }

    #[cfg(target_arch = "x86_64")]
    #[test]
    fn csp_and_managed_are_distinct_backends() {
        use std::any::type_name;

        assert_ne!(type_name::<aes::Aes128>(), type_name::<aes_soft::Aes128>());
        assert_ne!(type_name::<aes::Aes256>(), type_name::<aes_soft::Aes256>());
    }

    #[test]
    fn default_suite_order() {
        let names: Vec<&str> = DEFAULT_SUITE.iter().map(|spec| spec.name).collect();

        assert_eq!(
            names,
            [
                "AES(CSP) 128-bit",
                "AES(CSP) 256-bit",
                "AES Managed 128-bit",
                "AES Managed 256-bit",
                "Rijndael Managed 128-bit",
                "Rijndael Managed 256-bit",
                "DES 56-bit",
                "3DES 168-bit",
            ]
        );
    }
}
