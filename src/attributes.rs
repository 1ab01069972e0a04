// Per-shape attribute store.
// Immutable attributes hold one value per shape; mutable ones are versioned by keyframe
// and carry forward until the next keyframe that sets them.

use std::collections::BTreeMap;

use log::warn;

use crate::error::{AnnotationError, Result};
use crate::labels::{AttributeValue, LabelRegistry, RawValue};
use crate::payload::AttributeRecord;
use crate::types::{AttributeId, FrameNumber, LabelId};

#[derive(Debug, Clone, PartialEq, Default)]
pub struct AttributeStore {
    immutable: BTreeMap<AttributeId, AttributeValue>,
    mutable: BTreeMap<FrameNumber, BTreeMap<AttributeId, AttributeValue>>,
}

impl AttributeStore {
    /// Label defaults only: immutable values plus one mutable bucket at `anchor`.
    pub fn with_defaults(
        registry: &LabelRegistry,
        label: LabelId,
        anchor: FrameNumber,
    ) -> Result<Self> {
        let mut store = AttributeStore::default();
        for spec in registry.label_attributes(label)? {
            if spec.mutable {
                store
                    .mutable
                    .entry(anchor)
                    .or_default()
                    .insert(spec.id, spec.default_value());
            } else {
                store.immutable.insert(spec.id, spec.default_value());
            }
        }
        Ok(store)
    }

    /// Seed from label defaults, then overlay shape-level and per-position values.
    ///
    /// Shape-level values for mutable attributes land in the anchor bucket.
    pub fn import_attributes<'a>(
        registry: &LabelRegistry,
        label: LabelId,
        anchor: FrameNumber,
        shape_attributes: &[AttributeRecord],
        position_attributes: impl IntoIterator<Item = (FrameNumber, &'a [AttributeRecord])>,
    ) -> Result<Self> {
        let mut store = Self::with_defaults(registry, label, anchor)?;

        for record in shape_attributes {
            store.overlay(registry, label, anchor, record)?;
        }
        for (frame, records) in position_attributes {
            for record in records {
                store.overlay(registry, label, frame, record)?;
            }
        }

        Ok(store)
    }

    fn overlay(
        &mut self,
        registry: &LabelRegistry,
        label: LabelId,
        frame: FrameNumber,
        record: &AttributeRecord,
    ) -> Result<()> {
        let belongs = registry
            .label_attributes(label)?
            .iter()
            .any(|spec| spec.id == record.id);
        if !belongs {
            warn!(
                "attribute {} does not belong to label {}, ignored",
                record.id, label
            );
            return Ok(());
        }
        self.set_value(registry, frame, record.id, record.value.clone())
    }

    /// Value of `attr` visible at `frame`.
    ///
    /// Mutable attributes take the value of the latest keyframe at or before `frame`
    /// that sets them. With no such keyframe this fails with `MissingKeyframe` rather
    /// than falling back to the label default.
    pub fn value_at(
        &self,
        registry: &LabelRegistry,
        frame: FrameNumber,
        attr: AttributeId,
    ) -> Result<AttributeValue> {
        let spec = registry.attr_info(attr)?;
        if !spec.mutable {
            return self
                .immutable
                .get(&attr)
                .cloned()
                .ok_or(AnnotationError::UnknownAttribute(attr));
        }

        self.mutable
            .range(..=frame)
            .rev()
            .find_map(|(_, bucket)| bucket.get(&attr))
            .cloned()
            .ok_or(AnnotationError::MissingKeyframe {
                attribute: attr,
                frame,
            })
    }

    /// Every attribute of `label` as visible at `frame`, in schema order.
    pub fn values_at(
        &self,
        registry: &LabelRegistry,
        label: LabelId,
        frame: FrameNumber,
    ) -> Result<Vec<(AttributeId, AttributeValue)>> {
        registry
            .label_attributes(label)?
            .iter()
            .map(|spec| Ok((spec.id, self.value_at(registry, frame, spec.id)?)))
            .collect()
    }

    /// Normalize and write a value. Mutable attributes get a bucket at `frame`.
    pub fn set_value(
        &mut self,
        registry: &LabelRegistry,
        frame: FrameNumber,
        attr: AttributeId,
        raw: RawValue,
    ) -> Result<()> {
        let spec = registry.attr_info(attr)?;
        let value = spec.normalize(raw)?;
        if spec.mutable {
            self.mutable.entry(frame).or_default().insert(attr, value);
        } else {
            self.immutable.insert(attr, value);
        }
        Ok(())
    }

    /// Drop all attribute state and reseed from `label`'s schema.
    pub fn change_label(
        &mut self,
        registry: &LabelRegistry,
        label: LabelId,
        anchor: FrameNumber,
    ) -> Result<()> {
        *self = Self::with_defaults(registry, label, anchor)?;
        Ok(())
    }

    pub fn immutable(&self) -> &BTreeMap<AttributeId, AttributeValue> {
        &self.immutable
    }

    pub fn bucket(&self, frame: FrameNumber) -> Option<&BTreeMap<AttributeId, AttributeValue>> {
        self.mutable.get(&frame)
    }

    /// Frames holding at least one mutable value.
    pub fn mutable_frames(&self) -> impl Iterator<Item = FrameNumber> + '_ {
        self.mutable.keys().copied()
    }

    pub fn remove_bucket(&mut self, frame: FrameNumber) {
        self.mutable.remove(&frame);
    }

    /// Copy values from the bucket at `from` into `to` where `to` does not set them.
    pub fn backfill(&mut self, from: FrameNumber, to: FrameNumber) {
        let Some(source) = self.mutable.get(&from).cloned() else {
            return;
        };
        let bucket = self.mutable.entry(to).or_default();
        for (attr, value) in source {
            bucket.entry(attr).or_insert(value);
        }
    }

    /// Move the bucket at `from` onto `to`, keeping values already set at `to`.
    pub fn rebase(&mut self, from: FrameNumber, to: FrameNumber) {
        let Some(old) = self.mutable.remove(&from) else {
            return;
        };
        let bucket = self.mutable.entry(to).or_default();
        for (attr, value) in old {
            bucket.entry(attr).or_insert(value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::labels::fixtures::*;

    fn f(n: u32) -> FrameNumber {
        FrameNumber::new(n)
    }

    fn car_store() -> (LabelRegistry, AttributeStore) {
        let registry = registry();
        let store = AttributeStore::with_defaults(&registry, CAR, f(2)).unwrap();
        (registry, store)
    }

    #[test]
    fn seeds_defaults_at_anchor() {
        let (registry, store) = car_store();
        assert_eq!(
            store.value_at(&registry, f(2), CAR_MODEL).unwrap(),
            AttributeValue::Text("sedan".into())
        );
        assert_eq!(
            store.value_at(&registry, f(50), CAR_PARKED).unwrap(),
            AttributeValue::Bool(false)
        );
        assert_eq!(store.mutable_frames().collect::<Vec<_>>(), vec![f(2)]);
    }

    #[test]
    fn mutable_values_carry_forward() {
        let registry = registry();
        let mut store = AttributeStore::with_defaults(&registry, PERSON, f(2)).unwrap();
        store
            .set_value(&registry, f(2), PERSON_POSE, "standing".into())
            .unwrap();
        store
            .set_value(&registry, f(7), PERSON_POSE, "sitting".into())
            .unwrap();

        let at = |n| store.value_at(&registry, f(n), PERSON_POSE).unwrap();
        assert_eq!(at(4), AttributeValue::Text("standing".into()));
        assert_eq!(at(7), AttributeValue::Text("sitting".into()));
        assert_eq!(at(9), AttributeValue::Text("sitting".into()));
    }

    #[test]
    fn mutable_lookup_before_first_keyframe_fails_fast() {
        let (registry, store) = car_store();
        assert_eq!(
            store.value_at(&registry, f(1), CAR_SPEED).unwrap_err(),
            AnnotationError::MissingKeyframe {
                attribute: CAR_SPEED,
                frame: f(1)
            }
        );
        // Immutable attributes are frame independent.
        assert!(store.value_at(&registry, f(1), CAR_MODEL).is_ok());
    }

    #[test]
    fn import_overlays_shape_and_position_values() {
        let registry = registry();
        let shape_attrs = vec![AttributeRecord::new(CAR_MODEL, "suv")];
        let at_five = vec![AttributeRecord::new(CAR_SPEED, "30")];
        let store = AttributeStore::import_attributes(
            &registry,
            CAR,
            f(0),
            &shape_attrs,
            vec![(f(5), at_five.as_slice())],
        )
        .unwrap();

        assert_eq!(
            store.value_at(&registry, f(9), CAR_MODEL).unwrap(),
            AttributeValue::Text("suv".into())
        );
        assert_eq!(
            store.value_at(&registry, f(4), CAR_SPEED).unwrap(),
            AttributeValue::Number(0.0)
        );
        assert_eq!(
            store.value_at(&registry, f(5), CAR_SPEED).unwrap(),
            AttributeValue::Number(30.0)
        );
    }

    #[test]
    fn import_ignores_foreign_attributes() {
        let registry = registry();
        let shape_attrs = vec![AttributeRecord::new(PERSON_POSE, "sitting")];
        let store =
            AttributeStore::import_attributes(&registry, CAR, f(0), &shape_attrs, Vec::new())
                .unwrap();
        assert!(store.bucket(f(0)).unwrap().get(&PERSON_POSE).is_none());
    }

    #[test]
    fn change_label_reseeds() {
        let (registry, mut store) = car_store();
        store.change_label(&registry, PERSON, f(2)).unwrap();
        assert!(store.immutable().is_empty());
        assert_eq!(
            store.value_at(&registry, f(2), PERSON_POSE).unwrap(),
            AttributeValue::Text("standing".into())
        );
        assert_eq!(
            store.change_label(&registry, 77, f(2)).unwrap_err(),
            AnnotationError::UnknownLabel(77)
        );
    }

    #[test]
    fn backfill_copies_missing_values() {
        let (registry, mut store) = car_store();
        store
            .set_value(&registry, f(1), CAR_SPEED, 15.0.into())
            .unwrap();
        store.backfill(f(2), f(1));

        let early = store.bucket(f(1)).unwrap();
        assert_eq!(early.get(&CAR_SPEED), Some(&AttributeValue::Number(15.0)));
        assert_eq!(early.get(&CAR_PARKED), Some(&AttributeValue::Bool(false)));
        assert_eq!(
            store.value_at(&registry, f(2), CAR_SPEED).unwrap(),
            AttributeValue::Number(0.0)
        );
    }

    #[test]
    fn rebase_keeps_existing_values() {
        let (registry, mut store) = car_store();
        store
            .set_value(&registry, f(6), CAR_SPEED, 80.0.into())
            .unwrap();
        store.rebase(f(2), f(6));

        let bucket = store.bucket(f(6)).unwrap();
        assert_eq!(bucket.get(&CAR_SPEED), Some(&AttributeValue::Number(80.0)));
        assert_eq!(bucket.get(&CAR_PARKED), Some(&AttributeValue::Bool(false)));
        assert!(store.bucket(f(2)).is_none());
    }
}
