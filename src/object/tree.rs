use std::cmp::Ordering;

use crate::error::{Error, Result};
use crate::hash::{ObjectId, ID_LEN};
use crate::types::{FileMode, Tree, TreeEntry};

/// encode a tree payload
///
/// `Tree` keeps its entries in canonical order, so the output only depends
/// on the entry set.
pub fn encode_tree(tree: &Tree) -> Vec<u8> {
    let mut out = Vec::with_capacity(tree.len() * (ID_LEN + 16));
    for entry in tree.entries() {
        out.extend_from_slice(entry.mode.as_str().as_bytes());
        out.push(b' ');
        out.extend_from_slice(entry.name.as_bytes());
        out.push(0);
        out.extend_from_slice(entry.id.as_bytes());
    }
    out
}

/// decode a tree payload
///
/// entries must already be in canonical order; anything else would re-encode
/// to different bytes and therefore a different id.
pub fn decode_tree(payload: &[u8]) -> Result<Tree> {
    let mut entries: Vec<TreeEntry> = Vec::new();
    let mut pos = 0;

    while pos < payload.len() {
        let rest = &payload[pos..];

        let space = rest
            .iter()
            .position(|&b| b == b' ')
            .ok_or_else(|| Error::malformed("tree", format!("missing space after mode at byte {}", pos)))?;
        let mode_str = std::str::from_utf8(&rest[..space])
            .map_err(|_| Error::InvalidMode(String::from_utf8_lossy(&rest[..space]).to_string()))?;
        let mode: FileMode = mode_str.parse()?;

        let nul = rest[space..]
            .iter()
            .position(|&b| b == 0)
            .map(|p| space + p)
            .ok_or_else(|| Error::malformed("tree", format!("unterminated entry name at byte {}", pos)))?;
        let name = std::str::from_utf8(&rest[space + 1..nul])
            .map_err(|_| Error::malformed("tree", "entry name is not utf-8"))?;

        let id_start = nul + 1;
        let id_end = id_start + ID_LEN;
        if rest.len() < id_end {
            return Err(Error::malformed(
                "tree",
                format!("truncated object id for entry {:?}", name),
            ));
        }
        let id = ObjectId::from_slice(&rest[id_start..id_end])?;

        let entry = TreeEntry::new(mode, name, id);
        if let Some(prev) = entries.last() {
            if TreeEntry::canonical_cmp(prev, &entry) != Ordering::Less {
                return Err(Error::malformed(
                    "tree",
                    format!("entry {:?} is out of order", entry.name),
                ));
            }
        }
        entries.push(entry);

        pos += id_end;
    }

    Tree::new(entries).map_err(|e| match e {
        Error::InvalidEntryName(name) => {
            Error::malformed("tree", format!("invalid entry name {:?}", name))
        }
        Error::DuplicateEntryName(name) => {
            Error::malformed("tree", format!("duplicate entry name {:?}", name))
        }
        other => other,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(byte: u8) -> ObjectId {
        ObjectId::from_bytes([byte; ID_LEN])
    }

    #[test]
    fn test_encode_layout() {
        let tree = Tree::new(vec![TreeEntry::new(FileMode::Regular, "a.txt", id(0xab))]).unwrap();
        let encoded = encode_tree(&tree);

        let mut expected = b"100644 a.txt\0".to_vec();
        expected.extend_from_slice(&[0xab; ID_LEN]);
        assert_eq!(encoded, expected);
    }

    #[test]
    fn test_tree_roundtrip() {
        let tree = Tree::new(vec![
            TreeEntry::new(FileMode::Regular, "README", id(1)),
            TreeEntry::new(FileMode::Executable, "run.sh", id(2)),
            TreeEntry::new(FileMode::Symlink, "link", id(3)),
            TreeEntry::new(FileMode::Directory, "src", id(4)),
        ])
        .unwrap();

        let decoded = decode_tree(&encode_tree(&tree)).unwrap();
        assert_eq!(decoded, tree);
    }

    #[test]
    fn test_insertion_order_does_not_matter() {
        let a = TreeEntry::new(FileMode::Regular, "a", id(1));
        let b = TreeEntry::new(FileMode::Directory, "b", id(2));
        let c = TreeEntry::new(FileMode::Regular, "c", id(3));

        let t1 = Tree::new(vec![a.clone(), b.clone(), c.clone()]).unwrap();
        let t2 = Tree::new(vec![c, a, b]).unwrap();
        assert_eq!(encode_tree(&t1), encode_tree(&t2));
    }

    #[test]
    fn test_decode_empty() {
        assert!(decode_tree(b"").unwrap().is_empty());
    }

    #[test]
    fn test_decode_accepts_padded_directory_mode() {
        let mut payload = b"040000 sub\0".to_vec();
        payload.extend_from_slice(&[7; ID_LEN]);

        let tree = decode_tree(&payload).unwrap();
        assert_eq!(tree.entries()[0].mode, FileMode::Directory);
    }

    fn raw_entry(mode: &str, name: &str, byte: u8) -> Vec<u8> {
        let mut out = format!("{} {}\0", mode, name).into_bytes();
        out.extend_from_slice(&[byte; ID_LEN]);
        out
    }

    #[test]
    fn test_decode_bad_names_are_malformed() {
        for name in ["a/b", ".", ".."] {
            let payload = raw_entry("100644", name, 1);
            assert!(
                matches!(decode_tree(&payload), Err(Error::MalformedObject { kind: "tree", .. })),
                "name {:?}",
                name
            );
        }
    }

    #[test]
    fn test_decode_file_and_dir_same_name_is_malformed() {
        // "a" sorts before "a/" so the order check alone lets this through
        let mut payload = raw_entry("100644", "a", 1);
        payload.extend(raw_entry("40000", "a", 2));

        assert!(matches!(
            decode_tree(&payload),
            Err(Error::MalformedObject { kind: "tree", .. })
        ));
    }

    #[test]
    fn test_decode_invalid_mode() {
        let mut payload = b"100600 file\0".to_vec();
        payload.extend_from_slice(&[7; ID_LEN]);

        assert!(matches!(decode_tree(&payload), Err(Error::InvalidMode(_))));
    }

    #[test]
    fn test_decode_truncated_id() {
        let mut payload = b"100644 file\0".to_vec();
        payload.extend_from_slice(&[7; 10]);

        assert!(matches!(
            decode_tree(&payload),
            Err(Error::MalformedObject { kind: "tree", .. })
        ));
    }

    #[test]
    fn test_decode_missing_terminator() {
        assert!(matches!(
            decode_tree(b"100644 file-without-nul"),
            Err(Error::MalformedObject { .. })
        ));
        assert!(matches!(
            decode_tree(b"garbage"),
            Err(Error::MalformedObject { .. })
        ));
    }

    #[test]
    fn test_decode_rejects_out_of_order() {
        let mut payload = Vec::new();
        for name in ["b", "a"] {
            payload.extend_from_slice(format!("100644 {}\0", name).as_bytes());
            payload.extend_from_slice(&[1; ID_LEN]);
        }

        assert!(matches!(
            decode_tree(&payload),
            Err(Error::MalformedObject { .. })
        ));
    }
}
