//! Pass-through validator.

use super::{write_body_head, ValidatorRequest, ValidatorResponse};
use crate::berghain::Berghain;
use crate::error::ValidationError;
use crate::level::LevelConfig;

/// Value of `"t"` in the body.
pub const KIND: u8 = 0;

/// Writes `{"c": <countdown>, "t": 0}` and issues a token. Never inspects
/// the request.
pub(crate) fn run(
    engine: &Berghain,
    level: &LevelConfig,
    req: &ValidatorRequest<'_>,
    resp: &mut ValidatorResponse,
) -> Result<(), ValidationError> {
    write_body_head(&mut resp.body, level, KIND)?;
    resp.body.write(b"}")?;
    engine.issue_token(&req.identifier, level, &mut resp.token)
}
