//! `image` subcommands.

use std::io::Write;

use kitsh_proto::image::{Image, ImageFormat};

use super::{HandlerContext, id_cell, metadata, parse_choice, parse_metadata, parse_uuid};
use crate::cli::ImageAction;
use crate::output::{ResolvedOutputFormat, Table, write_json_lines, write_table};
use crate::{AppError, IoStreams};

const COLUMNS: [&str; 5] = ["ID", "Format", "Size", "Read-only", "Media type"];

pub(crate) fn run<W: Write, E: Write>(
    action: ImageAction,
    context: &HandlerContext<'_>,
    io: &mut IoStreams<'_, W, E>,
) -> Result<(), AppError> {
    let images = context.client.images();
    match action {
        ImageAction::List => {
            let listed = images.list()?;
            render(&listed, context.format, io)
        }
        ImageAction::Create { format, size, data } => {
            if size == 0 {
                return Err(AppError::InvalidImageSize);
            }
            let format: ImageFormat = parse_choice(&format, |given, expected| {
                AppError::UnknownFormat { given, expected }
            })?;
            let data = parse_metadata(data.as_deref())?;
            let created = images.create(format, size, data)?;
            render(&[created], context.format, io)
        }
        ImageAction::Delete { id } => {
            let id = parse_uuid(&id)?;
            Ok(images.delete(id)?)
        }
        ImageAction::Metadata(args) => metadata::run(&images, args, context.format, io),
    }
}

fn render<W: Write, E: Write>(
    images: &[Image],
    format: ResolvedOutputFormat,
    io: &mut IoStreams<'_, W, E>,
) -> Result<(), AppError> {
    match format {
        ResolvedOutputFormat::Json => write_json_lines(io, images),
        ResolvedOutputFormat::Human => {
            let mut table = Table::new(&COLUMNS);
            for image in images {
                table.push_row(vec![
                    id_cell(image.id.as_ref()),
                    image.format.to_string(),
                    image.size.to_string(),
                    image.read_only.to_string(),
                    image.media_type.to_string(),
                ]);
            }
            write_table(io, &table)
        }
    }
}
