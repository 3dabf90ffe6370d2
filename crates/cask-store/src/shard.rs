//! Address codec: the mapping between addresses and sharded relative paths.
//!
//! An address's hex form is split into `segment_count` directory names of
//! `segment_width` characters each, followed by the remainder as the
//! filename:
//!
//! ```text
//! <store root>/
//!   <first segment_width hex chars>/
//!     <next segment_width hex chars>/
//!       <remaining hex chars>
//! ```
//!
//! With the default configuration (two segments of width two), the address
//! `9f86d081…0a08` maps to `9f/86/d081…0a08`. The mapping is a pure,
//! bijective function of the digest and the shard parameters; both
//! directions live here so they cannot drift apart.

use std::path::{Component, Path, PathBuf};

use cask_types::{Address, HEX_LEN};

use crate::error::{StoreError, StoreResult};

/// Map an address to its sharded relative path.
///
/// Fails with `InvalidConfiguration` when the prefix segments would consume
/// the whole hex string (or more), leaving no filename component. A store
/// validates its configuration at construction, so going through
/// [`Store`](crate::Store) this cannot fail.
pub fn shard_path(
    address: &Address,
    segment_count: usize,
    segment_width: usize,
) -> StoreResult<PathBuf> {
    if segment_count * segment_width >= HEX_LEN {
        return Err(StoreError::InvalidConfiguration {
            reason: format!(
                "{segment_count} segments of width {segment_width} leave no filename component \
                 for a {HEX_LEN}-character digest"
            ),
        });
    }

    let hex = address.to_hex();
    let mut path = PathBuf::new();
    for i in 0..segment_count {
        let start = i * segment_width;
        path.push(&hex[start..start + segment_width]);
    }
    path.push(&hex[segment_count * segment_width..]);
    Ok(path)
}

/// Map a sharded relative path back to the address it encodes.
///
/// The inverse of [`shard_path`]: concatenates the path components and
/// decodes the result. Fails with `MalformedAddress` when the path does not
/// have the expected component count and widths, or when the concatenation
/// is not a valid digest in hex form.
pub fn unshard_path(
    path: &Path,
    segment_count: usize,
    segment_width: usize,
) -> StoreResult<Address> {
    let mut hex = String::with_capacity(HEX_LEN);
    let mut components = 0usize;

    for component in path.components() {
        let Component::Normal(part) = component else {
            return Err(StoreError::MalformedAddress(format!(
                "path {} contains a non-plain component",
                path.display()
            )));
        };
        let Some(part) = part.to_str() else {
            return Err(StoreError::MalformedAddress(format!(
                "path {} is not valid UTF-8",
                path.display()
            )));
        };
        if components < segment_count && part.len() != segment_width {
            return Err(StoreError::MalformedAddress(format!(
                "shard segment {:?} in {} is not {segment_width} characters wide",
                part,
                path.display()
            )));
        }
        hex.push_str(part);
        components += 1;
    }

    if components != segment_count + 1 {
        return Err(StoreError::MalformedAddress(format!(
            "path {} has {components} components, expected {}",
            path.display(),
            segment_count + 1
        )));
    }

    Ok(Address::from_hex(&hex)?)
}
