//! Part requests and the physical instances expanded from them.

use crate::geometry::Mm;
use crate::{Error, Result};
use std::collections::BTreeMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A requested part type with a quantity.
///
/// Dimensions and quantity are validated at construction; a request can never
/// describe a zero-sized or zero-quantity part.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "PartRequestFields"))]
pub struct PartRequest {
    name: String,
    w: Mm,
    h: Mm,
    qty: usize,
    can_rotate: bool,
    meta: BTreeMap<String, String>,
}

impl PartRequest {
    /// Creates a rotatable request.
    pub fn new(name: impl Into<String>, w: Mm, h: Mm, qty: usize) -> Result<Self> {
        let name = name.into();
        if w <= 0 || h <= 0 {
            return Err(Error::InvalidPart(format!(
                "'{}' has invalid size {}x{}",
                name, w, h
            )));
        }
        if qty == 0 {
            return Err(Error::InvalidPart(format!("'{}' qty must be >= 1", name)));
        }
        Ok(Self {
            name,
            w,
            h,
            qty,
            can_rotate: true,
            meta: BTreeMap::new(),
        })
    }

    /// Sets whether the part may be turned by 90 degrees (grain/decor constraint).
    pub fn with_rotation(mut self, can_rotate: bool) -> Self {
        self.can_rotate = can_rotate;
        self
    }

    /// Attaches a free-form metadata entry (edge banding, material code, ...).
    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.meta.insert(key.into(), value.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn w(&self) -> Mm {
        self.w
    }

    pub fn h(&self) -> Mm {
        self.h
    }

    pub fn qty(&self) -> usize {
        self.qty
    }

    pub fn can_rotate(&self) -> bool {
        self.can_rotate
    }

    pub fn meta(&self) -> &BTreeMap<String, String> {
        &self.meta
    }

    /// Total area of all requested pieces.
    pub fn total_area(&self) -> Mm {
        self.w * self.h * self.qty as Mm
    }
}

/// Wire shape of [`PartRequest`]; deserialization goes through [`PartRequest::new`].
#[cfg(feature = "serde")]
#[derive(Deserialize)]
struct PartRequestFields {
    name: String,
    w: Mm,
    h: Mm,
    qty: usize,
    #[serde(default = "default_rotate")]
    can_rotate: bool,
    #[serde(default)]
    meta: BTreeMap<String, String>,
}

#[cfg(feature = "serde")]
fn default_rotate() -> bool {
    true
}

#[cfg(feature = "serde")]
impl TryFrom<PartRequestFields> for PartRequest {
    type Error = Error;

    fn try_from(raw: PartRequestFields) -> Result<Self> {
        let mut request = PartRequest::new(raw.name, raw.w, raw.h, raw.qty)?;
        request.can_rotate = raw.can_rotate;
        request.meta = raw.meta;
        Ok(request)
    }
}

/// One physical piece to cut.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PartInstance {
    /// Unique id, `"{name}#{k}"` with `k` starting at 1.
    pub id: String,
    /// Name of the request this instance came from.
    pub name: String,
    pub w: Mm,
    pub h: Mm,
    pub can_rotate: bool,
}

impl PartInstance {
    pub fn new(id: impl Into<String>, w: Mm, h: Mm, can_rotate: bool) -> Self {
        let id = id.into();
        let name = id.split('#').next().unwrap_or(&id).to_string();
        Self {
            id,
            name,
            w,
            h,
            can_rotate,
        }
    }

    pub fn area(&self) -> Mm {
        self.w * self.h
    }

    pub fn max_dim(&self) -> Mm {
        self.w.max(self.h)
    }

    /// Returns true if turning the part changes its footprint and is allowed.
    pub fn can_turn(&self) -> bool {
        self.can_rotate && self.w != self.h
    }

    /// Candidate `(w, h, rotated)` footprints, unrotated first.
    pub fn orientations(&self) -> Vec<(Mm, Mm, bool)> {
        let mut out = vec![(self.w, self.h, false)];
        if self.can_turn() {
            out.push((self.h, self.w, true));
        }
        out
    }

    /// Returns true if some allowed orientation fits inside `w` x `h`.
    pub fn fits_in(&self, w: Mm, h: Mm) -> bool {
        self.orientations()
            .iter()
            .any(|&(pw, ph, _)| pw <= w && ph <= h)
    }
}

/// Expands quantities into instances in stable request order.
pub fn expand_parts(requests: &[PartRequest]) -> Vec<PartInstance> {
    let mut out = Vec::with_capacity(requests.iter().map(|r| r.qty).sum());
    for request in requests {
        for k in 1..=request.qty {
            out.push(PartInstance {
                id: format!("{}#{}", request.name, k),
                name: request.name.clone(),
                w: request.w,
                h: request.h,
                can_rotate: request.can_rotate,
            });
        }
    }
    out
}

/// Sum of instance areas.
pub fn total_area(instances: &[PartInstance]) -> Mm {
    instances.iter().map(PartInstance::area).sum()
}
