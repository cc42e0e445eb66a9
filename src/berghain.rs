//! Engine facade.
//!
//! A [`Berghain`] owns everything derived from one secret and one level
//! table: the keyed hasher pool, the scratch pools and the clock handle.
//! It is built once and shared by reference between request handlers.

use std::fmt;
use std::sync::Arc;

use tracing::warn;

use crate::clock::ApproximateClock;
use crate::config::ConfigError;
use crate::error::ValidationError;
use crate::level::LevelConfig;
use crate::pool::{KeyedHasher, PlainHasher, Pool, Pooled, Reset, ScratchBuffer};
use crate::secret::Secret;
use crate::validator::{ValidatorRequest, ValidatorResponse};

/// Most levels a table may hold. Levels travel as one byte.
pub const MAX_LEVELS: usize = u8::MAX as usize;

/// Capacity of the scratch buffers used while decoding.
pub(crate) const SCRATCH_CAPACITY: usize = 128;

/// Token and challenge engine bound to one secret.
pub struct Berghain {
    levels: Box<[LevelConfig]>,
    pub(crate) keyed: Pool<KeyedHasher>,
    pub(crate) plain: Pool<PlainHasher>,
    pub(crate) scratch: Pool<ScratchBuffer>,
    responses: Pool<ValidatorResponse>,
    clock: Arc<ApproximateClock>,
}

impl Berghain {
    /// Builds an engine.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NoLevels`] for an empty table and
    /// [`ConfigError::TooManyLevels`] for more than [`MAX_LEVELS`] entries.
    pub fn new(
        secret: &Secret,
        levels: Vec<LevelConfig>,
        clock: Arc<ApproximateClock>,
    ) -> Result<Self, ConfigError> {
        if levels.is_empty() {
            return Err(ConfigError::NoLevels);
        }
        if levels.len() > MAX_LEVELS {
            return Err(ConfigError::TooManyLevels(levels.len()));
        }

        Ok(Self {
            levels: levels.into_boxed_slice(),
            keyed: KeyedHasher::pool(secret),
            plain: PlainHasher::pool(),
            scratch: Pool::new(|| ScratchBuffer::new(SCRATCH_CAPACITY)),
            responses: Pool::new(ValidatorResponse::new),
            clock,
        })
    }

    /// Configured levels, index = level - 1.
    #[must_use]
    pub fn levels(&self) -> &[LevelConfig] {
        &self.levels
    }

    /// Looks up the policy of `level`.
    ///
    /// Level 0 resolves to level 1 and anything past the table to its last
    /// entry. Both corrections are logged and never fail.
    #[must_use]
    pub fn level_config(&self, level: u8) -> &LevelConfig {
        let count = self.levels.len();
        let index = match usize::from(level) {
            0 => {
                warn!(level, "Level 0 requested, using level 1");
                0
            }
            l if l > count => {
                warn!(level, max = count, "Level above configured maximum, clamping");
                count - 1
            }
            l => l - 1,
        };
        &self.levels[index]
    }

    /// Shared clock used for expiry.
    #[must_use]
    pub fn clock(&self) -> &Arc<ApproximateClock> {
        &self.clock
    }

    /// Checks out an empty response from the pool.
    pub fn acquire_response(&self) -> Pooled<'_, ValidatorResponse> {
        self.responses.acquire()
    }

    /// Runs the validator configured for the requested level.
    ///
    /// `resp` is cleared first, so a response can be reused across calls.
    ///
    /// # Errors
    ///
    /// Returns whatever the selected validator rejects the request with.
    pub fn run_validator(
        &self,
        req: &ValidatorRequest<'_>,
        resp: &mut ValidatorResponse,
    ) -> Result<(), ValidationError> {
        resp.reset();
        let level = self.level_config(req.identifier.level);
        level.validation_type.run(self, level, req, resp)
    }
}

impl fmt::Debug for Berghain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Berghain")
            .field("levels", &self.levels)
            .field("clock", &self.clock)
            .finish_non_exhaustive()
    }
}
