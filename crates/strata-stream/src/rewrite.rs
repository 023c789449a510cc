//! Recursive, type-directed rewrite of block sequences

use crate::block::{BlockValue, StreamData};
use crate::transform::{BlockTransform, TransformError};

/// Rewrite every block of `block_type` in `data`, at any nesting depth
///
/// Matching entries have their value replaced by `transform`; the entry's
/// tag, id and extra keys are kept. A matching entry is not descended into.
/// Non-matching entries with a nested sequence are walked recursively; all
/// other entries pass through unchanged. Entry order is preserved at every
/// depth.
///
/// Returns the rewritten sequence and whether any matching entry's value
/// actually differs from what it was. Re-running an idempotent transform
/// therefore reports no change.
///
/// # Errors
/// Propagates the first [`TransformError`]; nothing of the partial rewrite
/// is returned.
pub fn migrate_structured_value<O, T>(
    owner: &O,
    block_type: &str,
    data: StreamData,
    transform: &T,
) -> Result<(StreamData, bool), TransformError>
where
    O: ?Sized,
    T: BlockTransform<O> + ?Sized,
{
    let mut changed = false;
    let mut migrated = Vec::with_capacity(data.len());

    for mut entry in data {
        if entry.block_type == block_type {
            let original = entry.value.clone();
            entry.value = transform.transform(owner, entry.value)?;
            changed |= entry.value != original;
        } else {
            entry.value = match entry.value {
                BlockValue::Nested(children) => {
                    let (children, nested_changed) = migrate_structured_value(
                        owner,
                        block_type,
                        StreamData::new(children),
                        transform,
                    )?;
                    changed |= nested_changed;
                    BlockValue::Nested(children.into_entries())
                }
                scalar @ BlockValue::Scalar(_) => scalar,
            };
        }
        migrated.push(entry);
    }

    Ok((StreamData::new(migrated), changed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::BlockEntry;
    use crate::transform::FnTransform;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn upper() -> impl BlockTransform<()> {
        FnTransform::new("upper", |_: &(), value: BlockValue| {
            let text = value
                .as_text()
                .ok_or_else(|| TransformError::InvalidInput("expected text".into()))?;
            Ok(BlockValue::text(text.to_uppercase()))
        })
    }

    fn data(raw: serde_json::Value) -> StreamData {
        StreamData::from_json(raw).unwrap()
    }

    #[test]
    fn replaces_matching_entry_in_place() {
        let input = data(json!([
            {"type": "a", "value": "first"},
            {"type": "target", "value": "second", "id": "t1"},
            {"type": "c", "value": "third"}
        ]));

        let (out, changed) = migrate_structured_value(&(), "target", input, &upper()).unwrap();

        assert!(changed);
        assert_eq!(
            out.to_json(),
            json!([
                {"type": "a", "value": "first"},
                {"type": "target", "value": "SECOND", "id": "t1"},
                {"type": "c", "value": "third"}
            ])
        );
    }

    #[test]
    fn finds_target_inside_container() {
        let input = data(json!([
            {"type": "section", "value": [
                {"type": "intro", "value": "keep"},
                {"type": "section", "value": [
                    {"type": "target", "value": "deep"}
                ]},
                {"type": "target", "value": "shallow"}
            ]}
        ]));

        let (out, changed) = migrate_structured_value(&(), "target", input, &upper()).unwrap();

        assert!(changed);
        assert_eq!(
            out.to_json(),
            json!([
                {"type": "section", "value": [
                    {"type": "intro", "value": "keep"},
                    {"type": "section", "value": [
                        {"type": "target", "value": "DEEP"}
                    ]},
                    {"type": "target", "value": "SHALLOW"}
                ]}
            ])
        );
    }

    #[test]
    fn changed_flag_survives_later_unchanged_containers() {
        let input = data(json!([
            {"type": "box", "value": [{"type": "target", "value": "x"}]},
            {"type": "box", "value": [{"type": "other", "value": "y"}]}
        ]));

        let (_, changed) = migrate_structured_value(&(), "target", input, &upper()).unwrap();
        assert!(changed);
    }

    #[test]
    fn no_match_leaves_data_equal() {
        let raw = json!([
            {"type": "a", "value": "[{\"type\": \"target\", \"value\": \"x\"}]"},
            {"type": "b", "value": {"target": "struct field"}},
            {"type": "c", "value": [{"type": "d", "value": 1}]}
        ]);
        let input = data(raw.clone());

        let (out, changed) = migrate_structured_value(&(), "target", input, &upper()).unwrap();

        assert!(!changed);
        assert_eq!(out.to_json(), raw);
    }

    #[test]
    fn matching_container_is_replaced_not_walked() {
        let calls = AtomicUsize::new(0);
        let counting = FnTransform::new("count", |_: &(), _value: BlockValue| {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(BlockValue::text("replaced"))
        });
        let input = data(json!([
            {"type": "target", "value": [{"type": "target", "value": "inner"}]}
        ]));

        let (out, changed) = migrate_structured_value(&(), "target", input, &counting).unwrap();

        assert!(changed);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(out.entries()[0].value, BlockValue::text("replaced"));
    }

    #[test]
    fn identical_replacement_is_not_a_change() {
        let input = data(json!([
            {"type": "box", "value": [{"type": "target", "value": "ALREADY"}]}
        ]));

        let (out, changed) = migrate_structured_value(&(), "target", input, &upper()).unwrap();

        assert!(!changed);
        assert_eq!(out.entries()[0].count_type("target"), 1);
    }

    #[test]
    fn transform_error_aborts() {
        let input = StreamData::new(vec![
            BlockEntry::new("target", BlockValue::text("ok")),
            BlockEntry::new("target", BlockValue::Scalar(json!(5))),
        ]);

        let result = migrate_structured_value(&(), "target", input, &upper());
        assert!(matches!(result, Err(TransformError::InvalidInput(_))));
    }

    #[test]
    fn owner_is_passed_through() {
        let prefix = FnTransform::new("prefix", |owner: &String, value: BlockValue| {
            Ok(BlockValue::text(format!("{owner}:{}", value.as_text().unwrap_or_default())))
        });
        let input = StreamData::new(vec![BlockEntry::new("target", BlockValue::text("v"))]);

        let (out, _) =
            migrate_structured_value(&"node-7".to_string(), "target", input, &prefix).unwrap();
        assert_eq!(out.entries()[0].value.as_text(), Some("node-7:v"));
    }

    #[test]
    fn untouched_siblings_keep_their_bytes() {
        let input = StreamData::from_json_str(
            r#"[{"id":"a1","value":"keep","type":"heading"},{"type":"text","value":"x"}]"#,
        )
        .unwrap();

        let (out, changed) = migrate_structured_value(&(), "text", input, &upper()).unwrap();

        assert!(changed);
        assert_eq!(
            out.to_json_string().unwrap(),
            r#"[{"id":"a1","value":"keep","type":"heading"},{"type":"text","value":"X"}]"#
        );
    }

    #[test]
    fn empty_sequence_is_unchanged() {
        let (out, changed) =
            migrate_structured_value(&(), "target", StreamData::empty(), &upper()).unwrap();
        assert!(!changed);
        assert!(out.is_empty());
    }
}
