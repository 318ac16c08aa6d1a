//! Normalizes Gazelle payloads into [`Group`]/[`Edition`]/[`Torrent`].
//!
//! Two entry points cover the per-tracker quirks:
//!
//! - [`parse_group_from_browse`] reads a single `browse` result, whose
//!   torrents carry `editionId` on both trackers.
//! - [`parse_group_hybrid`] reads a `torrentgroup` response. RED includes
//!   `editionId` per torrent; OPS does not, so the ids are recovered from a
//!   matching browse result via the remaster metadata tuple.

use std::collections::{BTreeMap, HashMap};

use serde_json::{Map, Value};
use tracing::debug;

use super::fields::{int_field, str_field};
use super::model::{Edition, Group, Torrent, first_artist_name};
use crate::api::envelope::{ShapeError, optional_list_of_objects, optional_object};

/// Remaster metadata tuple used when no tracker edition id is available.
type MetadataKey = (Option<i32>, String, String, String);

/// Edition grouping key; id keys sort before tuple keys.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum EditionKey {
    Id(i64),
    Metadata(MetadataKey),
}

fn metadata_key(torrent: &Torrent) -> MetadataKey {
    (
        torrent.remaster_year,
        torrent.remaster_title.trim().to_string(),
        torrent.remaster_label.trim().to_string(),
        torrent.remaster_catalog.trim().to_string(),
    )
}

fn edition_key(torrent: &Torrent) -> EditionKey {
    match torrent.edition_id {
        Some(id) => EditionKey::Id(id),
        None => EditionKey::Metadata(metadata_key(torrent)),
    }
}

/// Groups torrents into editions, preserving payload order inside each one.
///
/// Edition metadata comes from the first torrent of the edition.
fn group_into_editions(torrents: Vec<Torrent>) -> Vec<Edition> {
    let mut buckets: BTreeMap<EditionKey, Vec<Torrent>> = BTreeMap::new();
    for torrent in torrents {
        buckets.entry(edition_key(&torrent)).or_default().push(torrent);
    }
    buckets
        .into_values()
        .filter_map(|torrents| {
            let first = torrents.first()?.clone();
            Some(Edition {
                edition_id: first.edition_id,
                year: first.remaster_year,
                title: first.remaster_title,
                label: first.remaster_label,
                catalog: first.remaster_catalog,
                torrents,
            })
        })
        .collect()
}

fn parse_torrent(raw: &Map<String, Value>, id_keys: &[&str]) -> Torrent {
    let size = int_field(raw, &["size"]).unwrap_or(0);
    Torrent {
        torrent_id: int_field(raw, id_keys).unwrap_or(0),
        edition_id: int_field(raw, &["editionId", "editionid"]),
        media: str_field(raw, &["media"]).unwrap_or_default(),
        format: str_field(raw, &["format"]).unwrap_or_default(),
        encoding: str_field(raw, &["encoding"]).unwrap_or_default(),
        size: u64::try_from(size).unwrap_or(0),
        remaster_year: int_field(raw, &["remasterYear", "remasteryear"])
            .filter(|y| *y != 0)
            .and_then(|y| i32::try_from(y).ok()),
        remaster_title: str_field(raw, &["remasterTitle", "remastertitle"]).unwrap_or_default(),
        remaster_label: str_field(raw, &["remasterRecordLabel", "remasterrecordlabel"])
            .unwrap_or_default(),
        remaster_catalog: str_field(raw, &["remasterCatalogueNumber", "remastercataloguenumber"])
            .unwrap_or_default(),
    }
}

fn group_year(raw: &Map<String, Value>, keys: &[&str]) -> Option<i32> {
    int_field(raw, keys)
        .filter(|y| *y > 0)
        .and_then(|y| i32::try_from(y).ok())
}

/// Parses one `browse` result into a [`Group`].
///
/// # Errors
///
/// Returns [`ShapeError`] when `torrents` is not an array of objects.
pub fn parse_group_from_browse(result: &Map<String, Value>) -> Result<Group, ShapeError> {
    let raw_torrents = optional_list_of_objects(result, "torrents", "browse.result")?;
    let torrents = raw_torrents
        .into_iter()
        .map(|raw| parse_torrent(raw, &["torrentId", "torrentid", "id"]))
        .collect();

    let artist = str_field(result, &["artist"]).unwrap_or_else(|| first_artist_name(result));
    Ok(Group {
        group_id: int_field(result, &["groupId", "group_id", "groupid"]).unwrap_or(0),
        name: str_field(result, &["groupName", "groupname"]).unwrap_or_default(),
        artist,
        year: group_year(result, &["groupYear", "groupyear"]),
        release_type: str_field(result, &["releaseType", "releasetype"]).unwrap_or_default(),
        editions: group_into_editions(torrents),
    })
}

/// Parses `torrentgroup` data, recovering edition ids from `browse_result`.
///
/// `group` is the response's `group` object and `torrents` its torrent list.
/// Torrents that already carry an `editionId` keep it; the rest take the id
/// of the browse torrent with an identical remaster tuple, if any.
///
/// # Errors
///
/// Returns [`ShapeError`] when the browse result's `torrents` field is
/// malformed, or when `musicInfo` is not an object.
pub fn parse_group_hybrid(
    group: &Map<String, Value>,
    torrents: &[&Map<String, Value>],
    browse_result: Option<&Map<String, Value>>,
) -> Result<Group, ShapeError> {
    let mut edition_ids: HashMap<MetadataKey, i64> = HashMap::new();
    if let Some(browse) = browse_result {
        for raw in optional_list_of_objects(browse, "torrents", "browse.result")? {
            let parsed = parse_torrent(raw, &["torrentId", "id"]);
            if let Some(id) = parsed.edition_id {
                edition_ids.entry(metadata_key(&parsed)).or_insert(id);
            }
        }
    }

    let mut recovered = 0usize;
    let parsed: Vec<Torrent> = torrents
        .iter()
        .map(|raw| {
            let mut torrent = parse_torrent(raw, &["id", "torrentId"]);
            if torrent.edition_id.is_none() {
                if let Some(id) = edition_ids.get(&metadata_key(&torrent)) {
                    torrent.edition_id = Some(*id);
                    recovered += 1;
                }
            }
            torrent
        })
        .collect();
    if recovered > 0 {
        debug!(recovered, "Recovered edition ids from browse result");
    }

    let artist = optional_object(group, "musicInfo", "torrentgroup.group")?
        .map(first_artist_name)
        .unwrap_or_default();

    Ok(Group {
        group_id: int_field(group, &["id", "groupId"]).unwrap_or(0),
        name: str_field(group, &["name", "groupName"]).unwrap_or_default(),
        artist,
        year: group_year(group, &["year", "groupYear"]),
        release_type: str_field(group, &["releaseType", "releasetype"]).unwrap_or_default(),
        editions: group_into_editions(parsed),
    })
}

/// Parses a full `torrentgroup` response object (`{group, torrents}`).
///
/// # Errors
///
/// Returns [`ShapeError`] when `group` is missing or either field is
/// malformed.
pub fn parse_torrentgroup_response(
    response: &Map<String, Value>,
    browse_result: Option<&Map<String, Value>>,
) -> Result<Group, ShapeError> {
    let group = optional_object(response, "group", "torrentgroup.response")?.ok_or_else(|| {
        ShapeError {
            context: "torrentgroup.response.group".to_string(),
            reason: "is missing".to_string(),
            failure_envelope: false,
        }
    })?;
    let torrents = optional_list_of_objects(response, "torrents", "torrentgroup.response")?;
    parse_group_hybrid(group, &torrents, browse_result)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    fn obj(value: &Value) -> &Map<String, Value> {
        value.as_object().unwrap()
    }

    #[test]
    fn test_browse_groups_by_edition_id() {
        let raw = json!({
            "groupId": 10,
            "groupName": "Album",
            "artist": "Band",
            "groupYear": 1999,
            "releaseType": "Album",
            "torrents": [
                {"torrentId": 1, "editionId": 2, "media": "CD", "format": "FLAC", "encoding": "Lossless", "size": 100, "remasterYear": 1999},
                {"torrentId": 2, "editionId": 1, "media": "Vinyl", "format": "FLAC", "encoding": "24bit Lossless", "size": 200, "remasterYear": 2015},
                {"torrentId": 3, "editionId": 2, "media": "CD", "format": "MP3", "encoding": "320", "size": 50, "remasterYear": 1999}
            ]
        });
        let group = parse_group_from_browse(obj(&raw)).unwrap();
        assert_eq!(group.group_id, 10);
        assert_eq!(group.year, Some(1999));
        assert_eq!(group.editions.len(), 2);
        assert_eq!(group.editions[0].edition_id, Some(1));
        assert_eq!(group.editions[1].edition_id, Some(2));
        let ids: Vec<i64> = group.editions[1].torrents.iter().map(|t| t.torrent_id).collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[test]
    fn test_remaster_year_zero_is_none() {
        let raw = json!({"groupId": 1, "torrents": [{"torrentId": 5, "remasterYear": 0, "media": "WEB"}]});
        let group = parse_group_from_browse(obj(&raw)).unwrap();
        assert_eq!(group.editions[0].year, None);
        assert_eq!(group.editions[0].torrents[0].remaster_year, None);
    }

    #[test]
    fn test_browse_rejects_non_array_torrents() {
        let raw = json!({"groupId": 1, "torrents": "nope"});
        let err = parse_group_from_browse(obj(&raw)).unwrap_err();
        assert!(err.context.contains("torrents"));
    }

    #[test]
    fn test_hybrid_recovers_edition_ids_from_browse() {
        let group = json!({"id": 7, "name": "Album", "year": 2001, "musicInfo": {"artists": [{"name": "Band"}]}});
        let t1 = json!({"id": 11, "media": "CD", "format": "FLAC", "encoding": "Lossless", "size": 1, "remasterYear": 2001, "remasterRecordLabel": "Label ", "remasterCatalogueNumber": "CAT1"});
        let t2 = json!({"id": 12, "media": "SACD", "format": "FLAC", "encoding": "Lossless", "size": 2, "remasterYear": 2001, "remasterRecordLabel": "Label", "remasterCatalogueNumber": "CAT1"});
        let browse = json!({"torrents": [
            {"torrentId": 11, "editionId": 3, "remasterYear": 2001, "remasterRecordLabel": "Label", "remasterCatalogueNumber": "CAT1"}
        ]});
        let torrents = vec![obj(&t1), obj(&t2)];
        let parsed = parse_group_hybrid(obj(&group), &torrents, Some(obj(&browse))).unwrap();
        assert_eq!(parsed.artist, "Band");
        assert_eq!(parsed.editions.len(), 1);
        assert_eq!(parsed.editions[0].edition_id, Some(3));
        assert_eq!(parsed.editions[0].torrents.len(), 2);
    }

    #[test]
    fn test_hybrid_keeps_native_edition_ids_apart() {
        let group = json!({"id": 7, "name": "Album"});
        let cd = json!({"id": 1, "editionId": 100, "media": "CD", "remasterYear": 2001});
        let sacd = json!({"id": 2, "editionId": 101, "media": "SACD", "remasterYear": 2001});
        let parsed = parse_group_hybrid(obj(&group), &[obj(&cd), obj(&sacd)], None).unwrap();
        assert_eq!(parsed.editions.len(), 2);
        assert_eq!(parsed.editions[0].media_types().into_iter().collect::<Vec<_>>(), vec!["CD"]);
    }

    #[test]
    fn test_hybrid_falls_back_to_metadata_tuple_and_sorts_ids_first() {
        let group = json!({"id": 7, "name": "Album"});
        let a = json!({"id": 1, "media": "CD", "remasterYear": 1990});
        let b = json!({"id": 2, "editionId": 50, "media": "WEB", "remasterYear": 2010});
        let c = json!({"id": 3, "media": "Vinyl", "remasterYear": 1990});
        let parsed = parse_group_hybrid(obj(&group), &[obj(&a), obj(&b), obj(&c)], None).unwrap();
        assert_eq!(parsed.editions.len(), 2);
        assert_eq!(parsed.editions[0].edition_id, Some(50));
        assert_eq!(parsed.editions[1].edition_id, None);
        assert_eq!(parsed.editions[1].torrents.len(), 2);
    }

    #[test]
    fn test_all_empty_tuples_collapse_into_one_edition() {
        let group = json!({"id": 7});
        let a = json!({"id": 1, "media": "CD"});
        let b = json!({"id": 2, "media": "SACD"});
        let parsed = parse_group_hybrid(obj(&group), &[obj(&a), obj(&b)], None).unwrap();
        assert_eq!(parsed.editions.len(), 1);
    }

    #[test]
    fn test_torrentgroup_response_requires_group() {
        let response = json!({"torrents": []});
        let err = parse_torrentgroup_response(obj(&response), None).unwrap_err();
        assert_eq!(err.context, "torrentgroup.response.group");
    }

    #[test]
    fn test_out_of_range_years_are_dropped() {
        let raw = json!({"groupId": 1, "groupYear": 9_000_000_000_i64, "torrents": [
            {"torrentId": 5, "remasterYear": 9_000_000_000_i64, "media": "WEB"}
        ]});
        let group = parse_group_from_browse(obj(&raw)).unwrap();
        assert_eq!(group.year, None);
        assert_eq!(group.editions[0].torrents[0].remaster_year, None);
    }
}
