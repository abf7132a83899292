use super::*;

fn sorted(names: &[&str]) -> Vec<String> {
    let mut files: Vec<MigrationFile> = names
        .iter()
        .map(|n| MigrationFile::try_new(*n).unwrap())
        .collect();
    files.sort();
    files.into_iter().map(|f| f.filename().to_string()).collect()
}

#[test]
fn test_empty_name_rejected() {
    assert!(MigrationFile::try_new("").is_none());
}

#[test]
fn test_prefix_parsed() {
    let file = MigrationFile::try_new("007-add_index.yaml").unwrap();
    assert_eq!(file.prefix_number(), Some(7));
    assert_eq!(file.filename(), "007-add_index.yaml");

    let bare = MigrationFile::try_new("seed_users.yaml").unwrap();
    assert_eq!(bare.prefix_number(), None);
}

#[test]
fn test_numeric_prefix_orders_by_value() {
    assert_eq!(
        sorted(&["10-x.yaml", "2-x.yaml", "1-x.yaml"]),
        vec!["1-x.yaml", "2-x.yaml", "10-x.yaml"]
    );
}

#[test]
fn test_zero_padded_and_unpadded_interleave() {
    assert_eq!(
        sorted(&["010-c.yaml", "9-b.yaml", "001-a.yaml"]),
        vec!["001-a.yaml", "9-b.yaml", "010-c.yaml"]
    );
}

#[test]
fn test_unprefixed_sorts_last() {
    assert_eq!(
        sorted(&["zzz.yaml", "aaa.yaml", "999-last.yaml"]),
        vec!["999-last.yaml", "aaa.yaml", "zzz.yaml"]
    );
}

#[test]
fn test_equal_prefix_falls_back_to_name() {
    assert_eq!(
        sorted(&["3-b.yaml", "003-a.yaml", "3-a.yaml"]),
        vec!["003-a.yaml", "3-a.yaml", "3-b.yaml"]
    );
}

#[test]
fn test_huge_prefix_does_not_overflow() {
    let big = "123456789012345678901234567890-x.yaml";
    assert_eq!(sorted(&[big, "5-y.yaml"]), vec!["5-y.yaml", big]);
    assert_eq!(MigrationFile::try_new(big).unwrap().prefix_number(), None);
}

#[test]
fn test_dash_without_digits_is_not_prefix() {
    let file = MigrationFile::try_new("-odd.yaml").unwrap();
    assert_eq!(file.prefix_number(), None);
}

#[test]
fn test_has_migration_extension() {
    assert!(MigrationFile::has_migration_extension("001-a.yaml"));
    assert!(MigrationFile::has_migration_extension("001-a.YML"));
    assert!(!MigrationFile::has_migration_extension("001-a.sql"));
    assert!(!MigrationFile::has_migration_extension("README"));
}
