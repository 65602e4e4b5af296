//! Typed handlers behind the static `image` and `vm` commands.
//!
//! Every handler validates its arguments before the first remote call, so a
//! rejected argument never reaches the service.

pub(crate) mod image;
pub(crate) mod metadata;
pub(crate) mod vm;

use std::collections::BTreeMap;
use std::str::FromStr;

use kitsh_config::Config;
use kitsh_proto::{MetadataMap, Uuid};
use strum::VariantNames;

use crate::AppError;
use crate::output::ResolvedOutputFormat;
use crate::rpc::KitsuneClient;
use crate::vnc::StopSignal;

/// What a handler needs besides its arguments.
pub(crate) struct HandlerContext<'c> {
    pub(crate) client: &'c KitsuneClient,
    pub(crate) config: &'c Config,
    pub(crate) format: ResolvedOutputFormat,
    pub(crate) stop: &'c dyn StopSignal,
}

pub(crate) fn parse_uuid(text: &str) -> Result<Uuid, AppError> {
    Ok(text.parse::<Uuid>()?)
}

/// Parses `--data`. Absent data is the empty map.
pub(crate) fn parse_metadata(text: Option<&str>) -> Result<MetadataMap, AppError> {
    let Some(text) = text else {
        return Ok(MetadataMap::default());
    };
    let data: BTreeMap<String, String> =
        serde_json::from_str(text).map_err(AppError::InvalidMetadata)?;
    Ok(MetadataMap { data })
}

/// Parses a case-insensitive enum name, building `error` from the given text
/// and the accepted names on failure.
pub(crate) fn parse_choice<T>(
    text: &str,
    error: impl FnOnce(String, String) -> AppError,
) -> Result<T, AppError>
where
    T: FromStr + VariantNames,
{
    text.trim()
        .parse()
        .map_err(|_| error(text.to_owned(), T::VARIANTS.join(", ")))
}

/// Cell text for an optional identifier.
pub(crate) fn id_cell(id: Option<&Uuid>) -> String {
    id.map(ToString::to_string).unwrap_or_default()
}
