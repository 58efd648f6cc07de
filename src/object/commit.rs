use crate::error::{Error, Result};
use crate::hash::ObjectId;
use crate::types::Commit;

/// encode a commit payload
///
/// header values containing newlines are written as continuation lines
/// (each following line prefixed with a single space).
pub fn encode_commit(commit: &Commit) -> Vec<u8> {
    let mut out = String::new();

    push_header(&mut out, "tree", &commit.tree.to_hex());
    for parent in &commit.parents {
        push_header(&mut out, "parent", &parent.to_hex());
    }
    push_header(&mut out, "author", &commit.author);
    push_header(&mut out, "committer", &commit.committer);
    for (key, value) in &commit.extra_headers {
        push_header(&mut out, key, value);
    }

    out.push('\n');
    out.push_str(&commit.message);
    out.into_bytes()
}

fn push_header(out: &mut String, key: &str, value: &str) {
    out.push_str(key);
    out.push(' ');
    out.push_str(&value.replace('\n', "\n "));
    out.push('\n');
}

/// decode a commit payload
pub fn decode_commit(payload: &[u8]) -> Result<Commit> {
    let text = std::str::from_utf8(payload)
        .map_err(|_| Error::malformed("commit", "payload is not utf-8"))?;

    let blank = text
        .find("\n\n")
        .ok_or_else(|| Error::malformed("commit", "missing blank line after headers"))?;
    let message = &text[blank + 2..];

    let headers = parse_headers(&text[..blank])?;

    let mut tree = None;
    let mut parents = Vec::new();
    let mut author = None;
    let mut committer = None;
    let mut extra_headers = Vec::new();

    for (key, value) in headers {
        match key {
            "tree" if tree.is_none() => tree = Some(parse_id("tree", &value)?),
            "tree" => return Err(Error::malformed("commit", "duplicate tree header")),
            "parent" => parents.push(parse_id("parent", &value)?),
            "author" if author.is_none() => author = Some(value),
            "committer" if committer.is_none() => committer = Some(value),
            _ => extra_headers.push((key.to_string(), value)),
        }
    }

    let tree = tree.ok_or_else(|| Error::malformed("commit", "missing tree header"))?;

    Ok(Commit {
        tree,
        parents,
        author: author.unwrap_or_default(),
        committer: committer.unwrap_or_default(),
        extra_headers,
        message: message.to_string(),
    })
}

/// split header lines into (key, value), folding continuation lines
fn parse_headers(block: &str) -> Result<Vec<(&str, String)>> {
    let mut headers: Vec<(&str, String)> = Vec::new();

    for line in block.split('\n') {
        if let Some(cont) = line.strip_prefix(' ') {
            let (_, value) = headers
                .last_mut()
                .ok_or_else(|| Error::malformed("commit", "continuation line before any header"))?;
            value.push('\n');
            value.push_str(cont);
            continue;
        }

        let (key, value) = line
            .split_once(' ')
            .ok_or_else(|| Error::malformed("commit", format!("header line without value: {:?}", line)))?;
        if key.is_empty() {
            return Err(Error::malformed("commit", "empty header key"));
        }
        headers.push((key, value.to_string()));
    }

    Ok(headers)
}

fn parse_id(field: &str, value: &str) -> Result<ObjectId> {
    ObjectId::from_hex(value)
        .map_err(|_| Error::malformed("commit", format!("invalid {} id: {:?}", field, value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RESERVED_HEADERS;

    const TREE: &str = "4b825dc642cb6eb9a060e54bf8d69288fbee4904";
    const P1: &str = "1111111111111111111111111111111111111111";
    const P2: &str = "2222222222222222222222222222222222222222";

    fn tree_id() -> ObjectId {
        ObjectId::from_hex(TREE).unwrap()
    }

    #[test]
    fn test_encode_layout() {
        let commit = Commit::new(
            tree_id(),
            vec![ObjectId::from_hex(P1).unwrap()],
            "Alice <alice@example.com> 1700000000 +0000",
            "Initial commit\n",
        );

        let expected = format!(
            "tree {}\nparent {}\nauthor Alice <alice@example.com> 1700000000 +0000\n\
             committer Alice <alice@example.com> 1700000000 +0000\n\nInitial commit\n",
            TREE, P1
        );
        assert_eq!(String::from_utf8(encode_commit(&commit)).unwrap(), expected);
    }

    #[test]
    fn test_commit_roundtrip() {
        let commit = Commit::new(
            tree_id(),
            vec![ObjectId::from_hex(P1).unwrap(), ObjectId::from_hex(P2).unwrap()],
            "Alice <alice@example.com> 1700000000 +0000",
            "merge branches\n\nwith a body\n\nand blank lines",
        )
        .with_committer("Bob <bob@example.com> 1700000100 +0100");

        let decoded = decode_commit(&encode_commit(&commit)).unwrap();
        assert_eq!(decoded, commit);
    }

    #[test]
    fn test_multiline_header_roundtrip() {
        let commit = Commit::new(tree_id(), vec![], "a", "signed\n")
            .with_header(
                "gpgsig",
                "-----BEGIN PGP SIGNATURE-----\n\nabc\n-----END PGP SIGNATURE-----",
            )
            .unwrap();

        let encoded = encode_commit(&commit);
        let text = String::from_utf8(encoded.clone()).unwrap();
        assert!(text.contains("gpgsig -----BEGIN PGP SIGNATURE-----\n \n abc\n"));

        assert_eq!(decode_commit(&encoded).unwrap(), commit);
    }

    #[test]
    fn test_extra_headers_roundtrip_or_are_refused() {
        let base = Commit::new(tree_id(), vec![], "a", "m");

        // a header that could be misread as a parent or identity never gets in
        for key in RESERVED_HEADERS {
            assert!(base.clone().with_header(key, P1).is_err(), "{} accepted", key);
        }
        assert!(base.clone().with_header("my key", "v").is_err());

        let commit = base
            .with_header("encoding", "utf-8")
            .unwrap()
            .with_header("parents", P1)
            .unwrap()
            .with_header("mergetag", "object abc\ntype commit\n")
            .unwrap();
        let decoded = decode_commit(&encode_commit(&commit)).unwrap();
        assert_eq!(decoded, commit);
        assert!(decoded.parents.is_empty());
    }

    #[test]
    fn test_empty_message() {
        let commit = Commit::new(tree_id(), vec![], "a", "");
        assert_eq!(decode_commit(&encode_commit(&commit)).unwrap(), commit);
    }

    #[test]
    fn test_missing_tree() {
        let payload = "author a\ncommitter a\n\nmsg";
        assert!(matches!(
            decode_commit(payload.as_bytes()),
            Err(Error::MalformedObject { kind: "commit", .. })
        ));
    }

    #[test]
    fn test_bad_ids() {
        let short_tree = "tree abcd\nauthor a\ncommitter a\n\nmsg";
        assert!(matches!(
            decode_commit(short_tree.as_bytes()),
            Err(Error::MalformedObject { .. })
        ));

        let bad_parent = format!("tree {}\nparent nothex\nauthor a\ncommitter a\n\nmsg", TREE);
        assert!(matches!(
            decode_commit(bad_parent.as_bytes()),
            Err(Error::MalformedObject { .. })
        ));
    }

    #[test]
    fn test_missing_blank_line() {
        let payload = format!("tree {}\nauthor a\n", TREE);
        assert!(matches!(
            decode_commit(payload.as_bytes()),
            Err(Error::MalformedObject { .. })
        ));
    }

    #[test]
    fn test_missing_identities_default_to_empty() {
        let payload = format!("tree {}\n\nmsg", TREE);
        let commit = decode_commit(payload.as_bytes()).unwrap();
        assert_eq!(commit.author, "");
        assert_eq!(commit.committer, "");
        assert_eq!(commit.message, "msg");
    }

    #[test]
    fn test_message_may_look_like_headers() {
        let commit = Commit::new(tree_id(), vec![], "a", "tree is not a header here\nparent neither");
        assert_eq!(decode_commit(&encode_commit(&commit)).unwrap(), commit);
    }
}
