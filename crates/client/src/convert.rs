//! Conversion of high-level write requests into write-operation records.
//!
//! `create`, `set`, `update` and `delete` each produce the records the
//! service expects. Sentinel values are pulled out of the payload here:
//! `ServerTimestamp` becomes a field transform and `Delete` becomes a masked
//! field with no value.

use chrono::{DateTime, Utc};
use firestore_core::{
    get_field, Document, DocumentData, Error, FieldPath, FieldTransform, Precondition, Result,
    ServerValue, Timestamp, Value, Write, WriteOperation,
};
use indexmap::IndexMap;

/// Merge behaviour of a `set`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Merge {
    /// Merge every field present in the data
    All,
    /// Merge only the listed (dotted) field paths
    Fields(Vec<String>),
}

impl Merge {
    /// Merge restricted to `fields`.
    pub fn fields<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Merge::Fields(fields.into_iter().map(Into::into).collect())
    }
}

/// Payload with sentinels removed.
#[derive(Debug, Default)]
struct SplitData {
    fields: DocumentData,
    transforms: Vec<FieldPath>,
    deletes: Vec<FieldPath>,
}

/// Write-record builders.
#[derive(Debug, Clone, Copy, Default)]
pub struct Convert;

impl Convert {
    /// Records for creating `path`; fails server-side if it already exists.
    pub fn create_writes(path: &str, data: DocumentData) -> Result<Vec<Write>> {
        let split = split_data(&data, None)?;
        if let Some(field) = split.deletes.first() {
            return Err(Error::invalid_argument(format!(
                "DELETE cannot be used when creating a document (field {field})"
            )));
        }

        Ok(vec![update_write(
            path,
            split.fields,
            None,
            split.transforms,
            Some(Precondition::Exists(false)),
        )])
    }

    /// Records for setting `path`, overwriting or merging.
    pub fn set_writes(path: &str, data: DocumentData, merge: Option<Merge>) -> Result<Vec<Write>> {
        match merge {
            None => {
                let split = split_data(&data, None)?;
                if let Some(field) = split.deletes.first() {
                    return Err(Error::invalid_argument(format!(
                        "DELETE cannot be used in set without merge (field {field})"
                    )));
                }
                Ok(vec![update_write(
                    path,
                    split.fields,
                    None,
                    split.transforms,
                    None,
                )])
            }
            Some(Merge::All) => {
                let split = split_data(&data, None)?;
                let mut mask = leaf_paths(&split.fields, None)?;
                mask.extend(split.deletes);
                mask.sort();
                Ok(vec![update_write(
                    path,
                    split.fields,
                    Some(mask),
                    split.transforms,
                    None,
                )])
            }
            Some(Merge::Fields(fields)) => Self::merge_fields_write(path, &data, &fields),
        }
    }

    fn merge_fields_write(path: &str, data: &DocumentData, fields: &[String]) -> Result<Vec<Write>> {
        if fields.is_empty() {
            return Err(Error::invalid_argument("merge field list must not be empty"));
        }
        let merge_paths = parse_field_paths(fields)?;
        check_prefix_conflicts(&merge_paths)?;

        let mut selected = DocumentData::new();
        let mut mask = Vec::with_capacity(merge_paths.len());
        for merge_path in &merge_paths {
            let value = get_field(data, merge_path).ok_or_else(|| {
                Error::invalid_argument(format!(
                    "merge field {merge_path} is not present in the data"
                ))
            })?;
            if !matches!(value, Value::ServerTimestamp) {
                mask.push(merge_path.clone());
            }
            set_field(&mut selected, merge_path, value.clone());
        }

        let split = split_data(&selected, None)?;
        for deleted in &split.deletes {
            if !merge_paths.contains(deleted) {
                return Err(Error::invalid_argument(format!(
                    "DELETE field {deleted} must be named in the merge fields"
                )));
            }
        }

        Ok(vec![update_write(
            path,
            split.fields,
            Some(mask),
            split.transforms,
            None,
        )])
    }

    /// Records for updating an existing document.
    ///
    /// Keys of `data` are dotted field paths. With `update_time` the
    /// document must have been last modified at exactly that time; without
    /// it the document only has to exist.
    pub fn update_writes(
        path: &str,
        data: IndexMap<String, Value>,
        update_time: Option<DateTime<Utc>>,
    ) -> Result<Vec<Write>> {
        if data.is_empty() {
            return Err(Error::invalid_argument("update data must not be empty"));
        }

        let keys: Vec<String> = data.keys().cloned().collect();
        let field_paths = parse_field_paths(&keys)?;
        check_prefix_conflicts(&field_paths)?;

        let mut fields = DocumentData::new();
        let mut mask = Vec::new();
        let mut transforms = Vec::new();

        for (field_path, value) in field_paths.into_iter().zip(data.into_values()) {
            match value {
                Value::Delete => mask.push(field_path),
                Value::ServerTimestamp => transforms.push(field_path),
                Value::Map(map) => {
                    let split = split_data(&map, Some(&field_path))?;
                    if let Some(nested) = split.deletes.first() {
                        return Err(Error::invalid_argument(format!(
                            "DELETE cannot be nested in an update value (field {nested})"
                        )));
                    }
                    transforms.extend(split.transforms);
                    // a map made only of transforms contributes no value of its own
                    if map.is_empty() || !split.fields.is_empty() {
                        set_field(&mut fields, &field_path, Value::Map(split.fields));
                        mask.push(field_path);
                    }
                }
                other => {
                    check_no_sentinels(&other, &field_path)?;
                    set_field(&mut fields, &field_path, other);
                    mask.push(field_path);
                }
            }
        }

        let precondition = match update_time {
            Some(time) => Precondition::UpdateTime(time.into()),
            None => Precondition::Exists(true),
        };

        Ok(vec![update_write(
            path,
            fields,
            Some(mask),
            transforms,
            Some(precondition),
        )])
    }

    /// Record for deleting `path`.
    pub fn delete_write(
        path: &str,
        exists: Option<bool>,
        update_time: Option<DateTime<Utc>>,
    ) -> Result<Write> {
        let current_document = match (exists, update_time) {
            (Some(_), Some(_)) => {
                return Err(Error::invalid_argument(
                    "cannot specify both exists and update_time",
                ))
            }
            (Some(exists), None) => Some(Precondition::Exists(exists)),
            (None, Some(time)) => Some(Precondition::UpdateTime(time.into())),
            (None, None) => None,
        };

        Ok(Write {
            operation: WriteOperation::Delete(path.to_string()),
            update_mask: None,
            update_transforms: Vec::new(),
            current_document,
        })
    }

    /// Converts a wire timestamp into a local time; `None` stays `None`.
    pub fn timestamp_to_time(timestamp: Option<Timestamp>) -> Result<Option<DateTime<Utc>>> {
        timestamp.map(|ts| ts.to_datetime()).transpose()
    }

    /// Converts a local time into a wire timestamp.
    pub fn time_to_timestamp(time: DateTime<Utc>) -> Timestamp {
        time.into()
    }
}

fn update_write(
    path: &str,
    fields: DocumentData,
    update_mask: Option<Vec<FieldPath>>,
    transforms: Vec<FieldPath>,
    current_document: Option<Precondition>,
) -> Write {
    Write {
        operation: WriteOperation::Update(Document::new(path, fields)),
        update_mask,
        update_transforms: transforms
            .into_iter()
            .map(|field_path| FieldTransform {
                field_path,
                set_to_server_value: ServerValue::RequestTime,
            })
            .collect(),
        current_document,
    }
}

fn parse_field_paths(fields: &[String]) -> Result<Vec<FieldPath>> {
    fields.iter().map(|field| FieldPath::parse(field)).collect()
}

/// Rejects duplicates and paths that are a prefix of another path.
fn check_prefix_conflicts(paths: &[FieldPath]) -> Result<()> {
    let mut sorted: Vec<&FieldPath> = paths.iter().collect();
    sorted.sort();
    for pair in sorted.windows(2) {
        if pair[0].is_prefix_of(pair[1]) {
            return Err(Error::invalid_argument(format!(
                "field path {} conflicts with {}",
                pair[0], pair[1]
            )));
        }
    }
    Ok(())
}

/// Separates sentinels from plain values, recursing into maps.
fn split_data(data: &DocumentData, base: Option<&FieldPath>) -> Result<SplitData> {
    let mut split = SplitData::default();
    for (key, value) in data {
        let path = match base {
            Some(base) => base.child(key.as_str()),
            None => FieldPath::new([key.as_str()])?,
        };
        match value {
            Value::ServerTimestamp => split.transforms.push(path),
            Value::Delete => split.deletes.push(path),
            Value::Map(map) => {
                let nested = split_data(map, Some(&path))?;
                split.transforms.extend(nested.transforms);
                split.deletes.extend(nested.deletes);
                if map.is_empty() || !nested.fields.is_empty() {
                    split.fields.insert(key.clone(), Value::Map(nested.fields));
                }
            }
            other => {
                check_no_sentinels(other, &path)?;
                split.fields.insert(key.clone(), other.clone());
            }
        }
    }
    Ok(split)
}

fn check_no_sentinels(value: &Value, path: &FieldPath) -> Result<()> {
    match value {
        Value::Array(items) => {
            for item in items {
                if item.is_sentinel() {
                    return Err(Error::invalid_argument(format!(
                        "sentinel values cannot be used inside arrays (field {path})"
                    )));
                }
                check_no_sentinels(item, path)?;
            }
            Ok(())
        }
        Value::Map(map) => {
            for item in map.values() {
                if item.is_sentinel() {
                    return Err(Error::invalid_argument(format!(
                        "sentinel values cannot be nested in this value (field {path})"
                    )));
                }
                check_no_sentinels(item, path)?;
            }
            Ok(())
        }
        _ => Ok(()),
    }
}

/// Every leaf below `data`. Empty maps count as leaves.
fn leaf_paths(data: &DocumentData, base: Option<&FieldPath>) -> Result<Vec<FieldPath>> {
    let mut paths = Vec::new();
    for (key, value) in data {
        let path = match base {
            Some(base) => base.child(key.as_str()),
            None => FieldPath::new([key.as_str()])?,
        };
        match value {
            Value::Map(map) if !map.is_empty() => paths.extend(leaf_paths(map, Some(&path))?),
            _ => paths.push(path),
        }
    }
    Ok(paths)
}

/// Writes `value` at `path`, creating intermediate maps.
fn set_field(data: &mut DocumentData, path: &FieldPath, value: Value) {
    let segments = path.segments();
    let (last, parents) = match segments.split_last() {
        Some(split) => split,
        None => return,
    };

    let mut current = data;
    for segment in parents {
        let entry = current
            .entry(segment.clone())
            .or_insert_with(|| Value::Map(DocumentData::new()));
        if !matches!(entry, Value::Map(_)) {
            *entry = Value::Map(DocumentData::new());
        }
        let Value::Map(map) = entry else {
            return;
        };
        current = map;
    }
    current.insert(last.clone(), value);
}

#[cfg(test)]
mod tests {
    use super::*;
    use firestore_core::{data_from_json, WriteKind};
    use serde_json::json;

    const PATH: &str = "projects/p/databases/(default)/documents/cities/NYC";

    fn fp(path: &str) -> FieldPath {
        FieldPath::parse(path).unwrap()
    }

    fn update_data(pairs: Vec<(&str, Value)>) -> IndexMap<String, Value> {
        pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
    }

    #[test]
    fn test_create_requires_absence() {
        let data = data_from_json(json!({"name": "New York City"})).unwrap();
        let writes = Convert::create_writes(PATH, data.clone()).unwrap();
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0].kind(), WriteKind::Create);
        assert_eq!(writes[0].current_document, Some(Precondition::Exists(false)));
        assert_eq!(writes[0].fields(), Some(&data));
    }

    #[test]
    fn test_create_rejects_delete_sentinel() {
        let mut data = DocumentData::new();
        data.insert("name".into(), Value::Delete);
        assert!(Convert::create_writes(PATH, data).is_err());
    }

    #[test]
    fn test_set_without_merge_overwrites() {
        let data = data_from_json(json!({"name": "New York City"})).unwrap();
        let writes = Convert::set_writes(PATH, data, None).unwrap();
        assert_eq!(writes[0].kind(), WriteKind::Set);
        assert!(writes[0].update_mask.is_none());
        assert!(writes[0].current_document.is_none());
    }

    #[test]
    fn test_set_merge_all_masks_every_leaf() {
        let data = data_from_json(json!({
            "name": "New York City",
            "address": {"state": "NY", "zip": "10001"},
            "tags": {}
        }))
        .unwrap();
        let writes = Convert::set_writes(PATH, data, Some(Merge::All)).unwrap();
        assert_eq!(writes[0].kind(), WriteKind::Merge);
        assert_eq!(
            writes[0].update_mask,
            Some(vec![
                fp("address.state"),
                fp("address.zip"),
                fp("name"),
                fp("tags")
            ])
        );
    }

    #[test]
    fn test_set_merge_fields_restricts_payload() {
        let data = data_from_json(json!({"name": "NYC", "population": 8_400_000})).unwrap();
        let writes = Convert::set_writes(PATH, data, Some(Merge::fields(["name"]))).unwrap();
        assert_eq!(writes[0].update_mask, Some(vec![fp("name")]));
        let fields = writes[0].fields().unwrap();
        assert_eq!(fields.len(), 1);
        assert_eq!(fields["name"], Value::from("NYC"));
    }

    #[test]
    fn test_set_merge_fields_must_exist_in_data() {
        let data = data_from_json(json!({"name": "NYC"})).unwrap();
        assert!(Convert::set_writes(PATH, data, Some(Merge::fields(["mayor"]))).is_err());
    }

    #[test]
    fn test_set_merge_with_delete_sentinel() {
        let mut data = data_from_json(json!({"name": "NYC"})).unwrap();
        data.insert("mayor".into(), Value::Delete);

        assert!(Convert::set_writes(PATH, data.clone(), None).is_err());

        let writes = Convert::set_writes(PATH, data, Some(Merge::All)).unwrap();
        assert_eq!(writes[0].update_mask, Some(vec![fp("mayor"), fp("name")]));
        assert!(!writes[0].fields().unwrap().contains_key("mayor"));
    }

    #[test]
    fn test_server_timestamp_becomes_transform() {
        let mut data = data_from_json(json!({"name": "NYC"})).unwrap();
        data.insert("updated".into(), Value::ServerTimestamp);

        let writes = Convert::set_writes(PATH, data, None).unwrap();
        assert_eq!(writes.len(), 1);
        assert_eq!(
            writes[0].update_transforms,
            vec![FieldTransform {
                field_path: fp("updated"),
                set_to_server_value: ServerValue::RequestTime,
            }]
        );
        assert!(!writes[0].fields().unwrap().contains_key("updated"));
    }

    #[test]
    fn test_sentinel_in_array_rejected() {
        let mut data = DocumentData::new();
        data.insert("list".into(), Value::Array(vec![Value::ServerTimestamp]));
        assert!(Convert::set_writes(PATH, data, None).is_err());
    }

    #[test]
    fn test_update_nests_dotted_keys() {
        let writes = Convert::update_writes(
            PATH,
            update_data(vec![
                ("address.city", Value::from("New York")),
                ("population", Value::from(8_400_000i64)),
            ]),
            None,
        )
        .unwrap();

        let write = &writes[0];
        assert_eq!(write.kind(), WriteKind::Update);
        assert_eq!(write.current_document, Some(Precondition::Exists(true)));
        assert_eq!(
            write.update_mask,
            Some(vec![fp("address.city"), fp("population")])
        );
        let fields = write.fields().unwrap();
        assert_eq!(
            get_field(fields, &fp("address.city")),
            Some(&Value::from("New York"))
        );
    }

    #[test]
    fn test_update_with_update_time() {
        let time = chrono::TimeZone::with_ymd_and_hms(&Utc, 2020, 5, 1, 0, 0, 0).unwrap();
        let writes =
            Convert::update_writes(PATH, update_data(vec![("a", Value::from(1i64))]), Some(time))
                .unwrap();
        assert_eq!(
            writes[0].current_document,
            Some(Precondition::UpdateTime(time.into()))
        );
    }

    #[test]
    fn test_update_rejects_empty_and_conflicts() {
        assert!(Convert::update_writes(PATH, IndexMap::new(), None).is_err());

        let conflicting = update_data(vec![("a", Value::from(1i64)), ("a.b", Value::from(2i64))]);
        assert!(Convert::update_writes(PATH, conflicting, None).is_err());

        let duplicate = update_data(vec![("a.b", Value::from(1i64)), ("`a`.b", Value::from(2i64))]);
        assert!(Convert::update_writes(PATH, duplicate, None).is_err());
    }

    #[test]
    fn test_update_delete_and_server_time() {
        let writes = Convert::update_writes(
            PATH,
            update_data(vec![("mayor", Value::Delete), ("updated", Value::ServerTimestamp)]),
            None,
        )
        .unwrap();
        let write = &writes[0];
        assert_eq!(write.update_mask, Some(vec![fp("mayor")]));
        assert_eq!(write.update_transforms.len(), 1);
        assert!(write.fields().unwrap().is_empty());
    }

    #[test]
    fn test_delete_preconditions() {
        let plain = Convert::delete_write(PATH, None, None).unwrap();
        assert_eq!(plain.kind(), WriteKind::Delete);
        assert!(plain.current_document.is_none());

        let exists = Convert::delete_write(PATH, Some(true), None).unwrap();
        assert_eq!(exists.current_document, Some(Precondition::Exists(true)));

        let time = Utc::now();
        let guarded = Convert::delete_write(PATH, None, Some(time)).unwrap();
        assert_eq!(
            guarded.current_document,
            Some(Precondition::UpdateTime(Timestamp::from(time)))
        );
        assert_eq!(guarded.kind(), WriteKind::Delete);

        assert!(Convert::delete_write(PATH, Some(true), Some(time)).is_err());
    }

    #[test]
    fn test_timestamp_to_time() {
        assert_eq!(Convert::timestamp_to_time(None).unwrap(), None);
        let time = Convert::timestamp_to_time(Some(Timestamp::new(1_500_000_000, 5)))
            .unwrap()
            .unwrap();
        assert_eq!(time.timestamp(), 1_500_000_000);
        assert_eq!(time.timestamp_subsec_nanos(), 5);
        assert_eq!(Convert::time_to_timestamp(time), Timestamp::new(1_500_000_000, 5));
    }
}
