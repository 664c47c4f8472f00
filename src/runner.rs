use std::borrow::Cow;
use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::{Duration, Instant};

use log::{debug, error, info};
use rand::Rng;

use crate::algorithm::{CipherSpec, KeyMaterial};
use crate::config::BenchConfig;
use crate::error::{BenchError, Result};
use crate::report;

// Anything shorter was below the clock resolution
const MIN_DURATION: Duration = Duration::from_nanos(1);

/// Random plaintext shared by every measurement of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestBuffer {
    data: Vec<u8>,
}

impl TestBuffer {
    pub fn with_len(len: usize) -> Self {
        let mut data = vec![0u8; len];
        rand::thread_rng().fill(&mut data[..]);

        TestBuffer { data }
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }
}

/// Monotonic time since an arbitrary origin.
pub trait Clock {
    fn now(&self) -> Duration;
}

pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        MonotonicClock {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        MonotonicClock::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Persisted copy of the test buffer. Written once, never validated or regenerated.
#[derive(Debug, Clone)]
pub struct DiskArtifact {
    path: PathBuf,
}

impl DiskArtifact {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        DiskArtifact { path: path.into() }
    }

    pub fn ensure(&self, data: &TestBuffer) -> Result<Vec<u8>> {
        if !self.path.exists() {
            info!(
                "writing {} bytes of test data to {}",
                data.len(),
                self.path.display()
            );
            fs::write(&self.path, data.as_slice()).map_err(|e| self.io_failure(e))?;
        }

        fs::read(&self.path).map_err(|e| self.io_failure(e))
    }

    fn io_failure(&self, source: io::Error) -> BenchError {
        BenchError::DiskIOFailure {
            path: self.path.clone(),
            source,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataSource {
    Memory,
    Disk,
}

/// One timed encryption and what it produced.
#[derive(Debug, Clone, PartialEq)]
pub struct EncryptRun {
    pub seconds: f64,
    pub plaintext_len: usize,
    pub ciphertext: Vec<u8>,
}

/// The four timings of one cipher row, in seconds, and the bytes each path encrypted.
#[derive(Debug, Clone, PartialEq)]
pub struct Measurement {
    pub name: &'static str,
    pub memory_size: usize,
    pub disk_size: usize,
    pub encrypt_memory: f64,
    pub decrypt_memory: f64,
    pub encrypt_disk: f64,
    pub decrypt_disk: f64,
}

impl Measurement {
    pub fn seconds_per_block(&self) -> f64 {
        (self.encrypt_memory + self.decrypt_memory) / 2.0
    }

    pub fn bytes_per_second_ram(&self) -> f64 {
        self.memory_size as f64 / self.seconds_per_block()
    }

    pub fn bytes_per_second_hdd(&self) -> f64 {
        self.disk_size as f64 / ((self.encrypt_disk + self.decrypt_disk) / 2.0)
    }
}

pub struct BenchmarkRunner<C: Clock = MonotonicClock> {
    data: TestBuffer,
    artifact: DiskArtifact,
    clock: C,
}

impl BenchmarkRunner<MonotonicClock> {
    pub fn new(config: BenchConfig) -> Self {
        let data = Self::generate_test_data(&config);

        BenchmarkRunner::with_clock(config, data, MonotonicClock::default())
    }
}

impl<C: Clock> BenchmarkRunner<C> {
    pub fn with_clock(config: BenchConfig, data: TestBuffer, clock: C) -> Self {
        let artifact = DiskArtifact::new(config.artifact_path);

        BenchmarkRunner {
            data,
            artifact,
            clock,
        }
    }

    pub fn generate_test_data(config: &BenchConfig) -> TestBuffer {
        let data = TestBuffer::with_len(config.data_size);
        info!("generated {} bytes of test data", data.len());
        data
    }

    #[cfg(test)]
    pub fn test_data(&self) -> &TestBuffer {
        &self.data
    }

    /// Prints the header and one row per spec. Returns how many rows failed.
    pub fn run_all<W: Write>(&self, suite: &[CipherSpec], out: &mut W) -> io::Result<usize> {
        writeln!(out, "{}", report::HEADER)?;

        let mut failures = 0;

        for spec in suite {
            let row = match self.benchmark_one(spec) {
                Ok(measurement) => report::format_row(&measurement),
                Err(e) => {
                    error!("{}: {}", spec.name, e);
                    failures += 1;
                    report::format_error_row(spec.name)
                }
            };

            writeln!(out, "{}", row)?;
        }

        Ok(failures)
    }

    pub fn benchmark_one(&self, spec: &CipherSpec) -> Result<Measurement> {
        let key = spec.key_material()?;
        debug!("{}: {:?}", spec.name, key);

        self.measure_with_key(spec, &key)
    }

    /// Runs both paths under one key so they differ only by where the plaintext came from.
    pub fn measure_with_key(&self, spec: &CipherSpec, key: &KeyMaterial) -> Result<Measurement> {
        let memory = self.measure_encrypt(spec, key, DataSource::Memory)?;
        let decrypt_memory = self.measure_decrypt(spec, key, &memory.ciphertext)?;

        let disk = self.measure_encrypt(spec, key, DataSource::Disk)?;
        let decrypt_disk = self.measure_decrypt(spec, key, &disk.ciphertext)?;

        let measurement = Measurement {
            name: spec.name,
            memory_size: memory.plaintext_len,
            disk_size: disk.plaintext_len,
            encrypt_memory: memory.seconds,
            decrypt_memory,
            encrypt_disk: disk.seconds,
            decrypt_disk,
        };
        debug!("{:?}", measurement);

        Ok(measurement)
    }

    /// Times one full-buffer encryption. The ciphertext is handed back for the paired decrypt.
    pub fn measure_encrypt(
        &self,
        spec: &CipherSpec,
        key: &KeyMaterial,
        source: DataSource,
    ) -> Result<EncryptRun> {
        let plaintext: Cow<[u8]> = match source {
            DataSource::Memory => Cow::Borrowed(self.data.as_slice()),
            DataSource::Disk => Cow::Owned(self.ensure_disk_artifact()?),
        };

        // Throughput of nothing is meaningless
        if plaintext.is_empty() {
            return Err(spec.family.transform_failure(format!("empty {:?} plaintext", source)));
        }

        let encryptor = spec.family.transform(key)?;

        let (seconds, ciphertext) = self.time(|| encryptor.encrypt(&plaintext));

        Ok(EncryptRun {
            seconds,
            plaintext_len: plaintext.len(),
            ciphertext,
        })
    }

    /// Times one full-buffer decryption of `ciphertext`, which always comes from memory.
    pub fn measure_decrypt(
        &self,
        spec: &CipherSpec,
        key: &KeyMaterial,
        ciphertext: &[u8],
    ) -> Result<f64> {
        let decryptor = spec.family.transform(key)?;

        let (elapsed, plaintext) = self.time(|| decryptor.decrypt(ciphertext));
        plaintext.map_err(|e| spec.family.transform_failure(e))?;

        Ok(elapsed)
    }

    pub fn ensure_disk_artifact(&self) -> Result<Vec<u8>> {
        self.artifact.ensure(&self.data)
    }

    fn time<T, F: FnOnce() -> T>(&self, op: F) -> (f64, T) {
        let start = self.clock.now();
        let value = op();
        let elapsed = self.clock.now().saturating_sub(start).max(MIN_DURATION);

        (elapsed.as_secs_f64(), value)
    }
}
