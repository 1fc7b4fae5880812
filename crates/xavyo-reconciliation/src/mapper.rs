//! Maps external change records onto local entity drafts and patches.

use tracing::warn;

use xavyo_connector::change::ChangeRecord;
use xavyo_connector::mapping::MappingTarget;
use xavyo_connector::operation::AttributeValue;

use crate::binding::KindBinding;
use crate::entity::{EntityDraft, EntityPatch, LocalEntity};

/// Builds local-side proposals from records of one kind binding.
#[derive(Debug, Clone, Copy)]
pub struct EntityMapper<'a> {
    binding: &'a KindBinding,
    sync_status: bool,
}

impl<'a> EntityMapper<'a> {
    /// Mapper for a binding; `sync_status` carries the external enabled flag.
    #[must_use]
    pub fn new(binding: &'a KindBinding, sync_status: bool) -> Self {
        Self {
            binding,
            sync_status,
        }
    }

    /// Natural name mapped from the record, if the mapping has a name item.
    ///
    /// The account id item falls back to the record uid when the external
    /// attribute is missing.
    #[must_use]
    pub fn mapped_name(&self, record: &ChangeRecord) -> Option<String> {
        self.binding
            .mapping()
            .items
            .iter()
            .filter(|item| item.target == MappingTarget::Name)
            .filter_map(|item| {
                record
                    .attributes()
                    .get_string(&item.external_attribute)
                    .map(str::to_string)
                    .or_else(|| item.account_id.then(|| record.uid().to_string()))
            })
            .last()
    }

    /// Proposed new entity.
    #[must_use]
    pub fn draft(&self, record: &ChangeRecord) -> EntityDraft {
        let kind = self.binding.kind().clone();
        let mut draft = EntityDraft {
            name: self
                .mapped_name(record)
                .unwrap_or_else(|| record.uid().to_string()),
            attributes: Default::default(),
            resources: Default::default(),
            enabled: None,
            kind,
        };

        for item in &self.binding.mapping().items {
            if item.target != MappingTarget::PlainSchema {
                continue;
            }
            match record.attributes().get(&item.external_attribute) {
                Some(values) => {
                    let typed: Vec<AttributeValue> = values
                        .iter()
                        .map(|value| self.typed(record, &item.internal_attribute, value))
                        .collect();
                    draft
                        .attributes
                        .set_values(item.internal_attribute.clone(), typed);
                }
                None if item.account_id => {
                    let value = AttributeValue::String(record.uid().to_string());
                    let typed = self.typed(record, &item.internal_attribute, &value);
                    draft.attributes.set(item.internal_attribute.clone(), typed);
                }
                None => {}
            }
        }

        if self.sync_status && draft.kind.supports_status() {
            draft.enabled = record.enabled();
        }
        draft
    }

    /// Parse a textual value as the declared schema type of `schema`.
    ///
    /// Values that do not parse are kept as text.
    fn typed(&self, record: &ChangeRecord, schema: &str, value: &AttributeValue) -> AttributeValue {
        let AttributeValue::String(raw) = value else {
            return value.clone();
        };
        match self.binding.schema_type(schema).parse_value(raw) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!(uid = %record.uid(), schema, error = %e, "Keeping attribute value as text");
                value.clone()
            }
        }
    }

    /// Patch bringing an existing entity in line with the record.
    ///
    /// The entity keeps its name when the mapping does not map one.
    #[must_use]
    pub fn patch(&self, record: &ChangeRecord, current: &LocalEntity) -> EntityPatch {
        let mut desired = self.draft(record);
        if self.mapped_name(record).is_none() {
            desired.name.clone_from(&current.name);
        }
        EntityPatch::diff(current, &desired)
    }
}
