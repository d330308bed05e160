#![allow(clippy::missing_errors_doc)]

use std::{error::Error, fmt};

use base64::{engine::general_purpose::STANDARD_NO_PAD, Engine as _};
use pushbox_core::{CellCoord, GridSize, Layout, LayoutError};
use serde::{Deserialize, Serialize};

const SHARE_DOMAIN: &str = "pushbox";
const SHARE_VERSION: &str = "v1";

/// Identifier prefix emitted before the encoded layout payload.
pub(crate) const SHARE_HEADER: &str = "pushbox:v1";
/// Delimiter used to separate the prefix, grid dimensions and payload.
const FIELD_DELIMITER: char = ':';

/// Encodes the layout into a single-line share code.
pub(crate) fn encode(layout: &Layout) -> Result<String, LayoutTransferError> {
    let payload = SerializableLayout {
        player: layout.player,
        blocks: layout.blocks.clone(),
        targets: layout.targets.clone(),
    };
    let json = serde_json::to_vec(&payload).map_err(LayoutTransferError::InvalidPayload)?;
    let encoded = STANDARD_NO_PAD.encode(json);
    Ok(format!(
        "{SHARE_HEADER}:{}x{}:{encoded}",
        layout.grid.columns(),
        layout.grid.rows()
    ))
}

/// Decodes and validates a layout from its share code.
pub(crate) fn decode(value: &str) -> Result<Layout, LayoutTransferError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(LayoutTransferError::EmptyPayload);
    }

    let mut parts = trimmed.split(FIELD_DELIMITER);
    let domain = parts.next().ok_or(LayoutTransferError::MissingPrefix)?;
    let version = parts.next().ok_or(LayoutTransferError::MissingVersion)?;
    let dimensions = parts.next().ok_or(LayoutTransferError::MissingDimensions)?;
    let payload = parts.next().ok_or(LayoutTransferError::MissingPayload)?;

    if domain != SHARE_DOMAIN {
        return Err(LayoutTransferError::InvalidPrefix(domain.to_owned()));
    }
    if version != SHARE_VERSION {
        return Err(LayoutTransferError::UnsupportedVersion(version.to_owned()));
    }

    let (columns, rows) = parse_dimensions(dimensions)?;
    let bytes = STANDARD_NO_PAD
        .decode(payload.as_bytes())
        .map_err(LayoutTransferError::InvalidEncoding)?;
    let decoded: SerializableLayout =
        serde_json::from_slice(&bytes).map_err(LayoutTransferError::InvalidPayload)?;

    let layout = Layout {
        grid: GridSize::new(columns, rows),
        player: decoded.player,
        blocks: decoded.blocks,
        targets: decoded.targets,
    };
    layout.validate().map_err(LayoutTransferError::InvalidLayout)?;
    Ok(layout)
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
struct SerializableLayout {
    player: CellCoord,
    blocks: Vec<CellCoord>,
    targets: Vec<CellCoord>,
}

/// Errors that can occur while decoding layout share codes.
#[derive(Debug)]
pub(crate) enum LayoutTransferError {
    /// The provided string was empty or contained only whitespace.
    EmptyPayload,
    /// The prefix segment was missing from the share code.
    MissingPrefix,
    /// The share code did not contain a version segment.
    MissingVersion,
    /// The share code did not include grid dimensions.
    MissingDimensions,
    /// The share code did not include the payload segment.
    MissingPayload,
    /// The share code used an unexpected prefix segment.
    InvalidPrefix(String),
    /// The share code used an unsupported version identifier.
    UnsupportedVersion(String),
    /// The grid dimensions could not be parsed from the share code.
    InvalidDimensions(String),
    /// The base64 payload could not be decoded.
    InvalidEncoding(base64::DecodeError),
    /// The payload could not be serialised or deserialised.
    InvalidPayload(serde_json::Error),
    /// The decoded arrangement is not a playable puzzle.
    InvalidLayout(LayoutError),
}

impl fmt::Display for LayoutTransferError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyPayload => write!(f, "layout code was empty"),
            Self::MissingPrefix => write!(f, "layout code is missing the prefix"),
            Self::MissingVersion => write!(f, "layout code is missing the version"),
            Self::MissingDimensions => write!(f, "layout code is missing the grid dimensions"),
            Self::MissingPayload => write!(f, "layout code is missing the payload"),
            Self::InvalidPrefix(prefix) => write!(f, "layout prefix '{prefix}' is not supported"),
            Self::UnsupportedVersion(version) => {
                write!(f, "layout version '{version}' is not supported")
            }
            Self::InvalidDimensions(dimensions) => {
                write!(f, "could not parse grid dimensions '{dimensions}'")
            }
            Self::InvalidEncoding(error) => {
                write!(f, "could not decode layout payload: {error}")
            }
            Self::InvalidPayload(error) => {
                write!(f, "could not parse layout payload: {error}")
            }
            Self::InvalidLayout(error) => write!(f, "layout is not playable: {error}"),
        }
    }
}

impl Error for LayoutTransferError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidEncoding(error) => Some(error),
            Self::InvalidPayload(error) => Some(error),
            Self::InvalidLayout(error) => Some(error),
            _ => None,
        }
    }
}

fn parse_dimensions(dimensions: &str) -> Result<(u32, u32), LayoutTransferError> {
    let (columns, rows) = dimensions
        .split_once(['x', 'X'])
        .ok_or_else(|| LayoutTransferError::InvalidDimensions(dimensions.to_owned()))?;

    let columns = columns
        .trim()
        .parse::<u32>()
        .map_err(|_| LayoutTransferError::InvalidDimensions(dimensions.to_owned()))?;
    let rows = rows
        .trim()
        .parse::<u32>()
        .map_err(|_| LayoutTransferError::InvalidDimensions(dimensions.to_owned()))?;

    if columns == 0 || rows == 0 {
        return Err(LayoutTransferError::InvalidDimensions(
            dimensions.to_owned(),
        ));
    }

    Ok((columns, rows))
}
