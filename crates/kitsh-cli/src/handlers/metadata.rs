//! `metadata` subcommands shared by both registries.

use std::io::Write;

use kitsh_proto::{MetadataMap, Uuid};

use super::{parse_metadata, parse_uuid};
use crate::cli::{MetadataAction, MetadataArgs};
use crate::output::{ResolvedOutputFormat, Table, write_json_pretty, write_table};
use crate::rpc::MetadataRegistry;
use crate::{AppError, IoStreams};

pub(crate) fn run<R, W, E>(
    registry: &R,
    args: MetadataArgs,
    format: ResolvedOutputFormat,
    io: &mut IoStreams<'_, W, E>,
) -> Result<(), AppError>
where
    R: MetadataRegistry,
    W: Write,
    E: Write,
{
    match args.action {
        None => {
            let id = parse_uuid(args.id.as_deref().ok_or(AppError::MissingId)?)?;
            show(registry, id, format, io)
        }
        Some(MetadataAction::Set { id, data }) => {
            let id = parse_uuid(&id)?;
            let meta = parse_metadata(Some(&data))?;
            Ok(registry.set_metadata(id, meta)?)
        }
        Some(MetadataAction::Clear { id }) => {
            let id = parse_uuid(&id)?;
            Ok(registry.set_metadata(id, MetadataMap::default())?)
        }
    }
}

fn show<R, W, E>(
    registry: &R,
    id: Uuid,
    format: ResolvedOutputFormat,
    io: &mut IoStreams<'_, W, E>,
) -> Result<(), AppError>
where
    R: MetadataRegistry,
    W: Write,
    E: Write,
{
    let meta = registry.get_metadata(id)?;
    match format {
        ResolvedOutputFormat::Json => write_json_pretty(io, &meta.data),
        ResolvedOutputFormat::Human => {
            let mut table = Table::new(&["Key", "Value"]);
            for (key, value) in meta.data {
                table.push_row(vec![key, value]);
            }
            write_table(io, &table)
        }
    }
}
