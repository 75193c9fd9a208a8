//! Batched mutation requests.
//!
//! Both batch types are column-oriented: one vector per field, matched by
//! position. Mismatched lengths are rejected before any work is done.

use glyph_types::{Address, DomainId, FormatTag, Slug};

use crate::error::{RegistryError, RegistryResult};

/// One item of a [`SetBatch`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SetItem {
    pub slug: Slug,
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub format: FormatTag,
}

/// A batch of content writes, applied all-or-nothing.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SetBatch {
    pub slugs: Vec<Slug>,
    pub data: Vec<Vec<u8>>,
    pub widths: Vec<u32>,
    pub heights: Vec<u32>,
    pub formats: Vec<FormatTag>,
}

impl SetBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, item: SetItem) {
        self.slugs.push(item.slug);
        self.data.push(item.data);
        self.widths.push(item.width);
        self.heights.push(item.height);
        self.formats.push(item.format);
    }

    /// Number of items, as given by the slug column.
    pub fn len(&self) -> usize {
        self.slugs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slugs.is_empty()
    }

    /// Every column must be as long as `slugs`.
    pub fn check_lengths(&self) -> RegistryResult<()> {
        let expected = self.slugs.len();
        check_column("data", expected, self.data.len())?;
        check_column("widths", expected, self.widths.len())?;
        check_column("heights", expected, self.heights.len())?;
        check_column("formats", expected, self.formats.len())
    }
}

impl FromIterator<SetItem> for SetBatch {
    fn from_iter<I: IntoIterator<Item = SetItem>>(iter: I) -> Self {
        let mut batch = Self::new();
        for item in iter {
            batch.push(item);
        }
        batch
    }
}

/// A batch of entity bindings, applied all-or-nothing.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BindBatch {
    pub entities: Vec<Address>,
    pub domains: Vec<DomainId>,
    pub slugs: Vec<Slug>,
}

impl BindBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entity: Address, domain: DomainId, slug: Slug) {
        self.entities.push(entity);
        self.domains.push(domain);
        self.slugs.push(slug);
    }

    /// Number of items, as given by the entity column.
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn check_lengths(&self) -> RegistryResult<()> {
        let expected = self.entities.len();
        check_column("domains", expected, self.domains.len())?;
        check_column("slugs", expected, self.slugs.len())
    }
}

fn check_column(field: &'static str, expected: usize, actual: usize) -> RegistryResult<()> {
    if expected == actual {
        Ok(())
    } else {
        Err(RegistryError::LengthMismatch {
            field,
            expected,
            actual,
        })
    }
}
