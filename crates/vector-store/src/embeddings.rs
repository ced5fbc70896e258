use crate::error::{Result, VectorStoreError};
use async_trait::async_trait;
use std::env;

/// Maps a synopsis to a fixed-length vector.
///
/// Implementations own any retry behavior; callers treat an error as final.
#[async_trait]
pub trait EmbeddingCapability: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Output dimensionality when known up front.
    fn dimension(&self) -> Option<usize> {
        None
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum EmbeddingMode {
    OpenAi,
    Stub,
}

impl EmbeddingMode {
    pub fn from_env() -> Result<Self> {
        let raw = env::var("REPOWIKI_EMBEDDING_MODE")
            .unwrap_or_else(|_| "openai".to_string())
            .to_ascii_lowercase();
        Self::parse(&raw)
    }

    pub fn parse(raw: &str) -> Result<Self> {
        match raw.trim() {
            "openai" => Ok(Self::OpenAi),
            "stub" => Ok(Self::Stub),
            other => Err(VectorStoreError::EmbeddingError(format!(
                "Unsupported REPOWIKI_EMBEDDING_MODE '{other}' (expected 'openai' or 'stub')"
            ))),
        }
    }

    pub const fn id(self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Stub => "stub",
        }
    }
}

/// Offline embedder: hashes the text into a deterministic unit vector.
/// Identical text always maps to the identical vector.
#[derive(Clone, Debug)]
pub struct StubEmbedder {
    dimension: usize,
}

impl StubEmbedder {
    pub const DEFAULT_DIMENSION: usize = 384;

    pub const fn new(dimension: usize) -> Self {
        Self { dimension }
    }
}

impl Default for StubEmbedder {
    fn default() -> Self {
        Self::new(Self::DEFAULT_DIMENSION)
    }
}

#[async_trait]
impl EmbeddingCapability for StubEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(stub_embed(text, self.dimension))
    }

    fn dimension(&self) -> Option<usize> {
        Some(self.dimension)
    }
}

fn stub_embed(text: &str, dimension: usize) -> Vec<f32> {
    let mut state =
        fnv1a_64(text.as_bytes()) ^ (dimension as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15);
    let mut vec = Vec::with_capacity(dimension);
    for _ in 0..dimension {
        let bits = splitmix64(&mut state);
        let high = (bits >> 32) as u32;
        let mantissa = high >> 9;
        let unit = f32::from_bits(0x3f80_0000 | mantissa) - 1.0;
        vec.push(unit.mul_add(2.0, -1.0));
    }
    normalize(&mut vec);
    vec
}

fn fnv1a_64(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in bytes {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash
}

const fn splitmix64(state: &mut u64) -> u64 {
    *state = state.wrapping_add(0x9E37_79B9_7F4A_7C15);
    let mut z = *state;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Scales `vector` to unit length in place; zero vectors are left alone.
pub fn normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > f32::EPSILON {
        for x in vector.iter_mut() {
            *x /= norm;
        }
    }
}

/// Fails unless every vector has the same length, and `expected` when the
/// embedder declared one.
pub fn ensure_uniform_dimension<'a>(
    vectors: impl IntoIterator<Item = &'a [f32]>,
    expected: Option<usize>,
) -> Result<()> {
    let mut expected = expected;
    for vector in vectors {
        match expected {
            Some(dim) if dim != vector.len() => {
                return Err(VectorStoreError::InvalidDimension {
                    expected: dim,
                    actual: vector.len(),
                })
            }
            Some(_) => {}
            None => expected = Some(vector.len()),
        }
    }
    Ok(())
}
