use anyhow::Result;
use kotordiff::diff::{
    CancelToken, DiffEngine, DiffOutcome, DiffReason, PathInfo, ResourceDiff, RootInput,
    destination_for, walk,
};
use kotordiff::formats::{Capsule, CapsuleKind, Gff, GffValue, Tlk, TlkEntry, TwoDa};
use kotordiff::mods::{Modify2Da, ModifyGff};
use kotordiff::{DiffConfig, DiffContext, Error, IncrementalPatchWriter};
use pretty_assertions::assert_eq;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn write_file(root: &Path, relative: &str, contents: &[u8]) -> PathBuf {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, contents).unwrap();
    path
}

fn twoda_bytes(rows: usize) -> Vec<u8> {
    let mut table = TwoDa::new(vec!["name".to_string(), "cost".to_string()]);
    for i in 0..rows {
        table.push_row(i.to_string(), vec![format!("item{i}"), (i * 10).to_string()]);
    }
    table.to_bytes().unwrap()
}

fn tlk_bytes(texts: &[&str]) -> Vec<u8> {
    let tlk = Tlk {
        language: 0,
        entries: texts.iter().map(|t| TlkEntry::new(*t, "")).collect(),
    };
    tlk.to_bytes().unwrap()
}

fn utc_bytes(hp: i16, gold: Option<i32>) -> Vec<u8> {
    let mut gff = Gff::new("UTC ");
    gff.root.set("Tag", GffValue::String("bar".to_string()));
    gff.root.set("HitPoints", GffValue::Int16(hp));
    if let Some(gold) = gold {
        gff.root.set("Gold", GffValue::Int32(gold));
    }
    gff.to_bytes().unwrap()
}

fn capsule_bytes(kind: CapsuleKind, entries: &[(&str, &str, Vec<u8>)]) -> Vec<u8> {
    let mut capsule = Capsule::new(kind);
    for (resref, ext, data) in entries {
        capsule.push(*resref, *ext, data.clone());
    }
    capsule.to_bytes().unwrap()
}

fn roots(a: &Path, b: &Path) -> Vec<RootInput> {
    vec![RootInput::from(a), RootInput::from(b)]
}

#[test]
fn identical_trees_report_no_modifications() -> Result<()> {
    let a = TempDir::new()?;
    let b = TempDir::new()?;
    for root in [a.path(), b.path()] {
        write_file(root, "foo.2da", &twoda_bytes(5));
        write_file(root, "notes/readme.txt", b"hello\nworld\n");
    }

    let engine = DiffEngine::new(DiffConfig::default());
    let report = engine.run(&roots(a.path(), b.path()), None)?;

    assert_eq!(report.outcome, DiffOutcome::Identical);
    assert!(report.modifications.is_empty());
    assert_eq!(report.groups, 2);
    assert_eq!(engine.compare(&roots(a.path(), b.path()), None), Some(true));
    Ok(())
}

#[test]
fn appended_table_row_becomes_single_add_row() -> Result<()> {
    let a = TempDir::new()?;
    let b = TempDir::new()?;
    write_file(a.path(), "foo.2da", &twoda_bytes(5));
    write_file(b.path(), "foo.2da", &twoda_bytes(6));

    let report = DiffEngine::new(DiffConfig::default()).run(&roots(a.path(), b.path()), None)?;

    assert_eq!(report.outcome, DiffOutcome::Different);
    assert_eq!(report.modifications.twoda.len(), 1);
    let table = &report.modifications.twoda[0];
    assert_eq!(table.source_file, "foo.2da");
    assert_eq!(table.destination, None);
    assert_eq!(
        table.modifiers,
        vec![Modify2Da::AddRow {
            identifier: "foo.2da_addrow_0".to_string(),
            row_label: "5".to_string(),
            cells: vec![
                ("name".to_string(), "item5".to_string()),
                ("cost".to_string(), "50".to_string()),
            ],
        }]
    );

    let target = kotordiff::Modification::TwoDa(table.clone()).install_target();
    assert_eq!(
        target,
        Some(("Override".to_string(), "foo.2da".to_string()))
    );
    Ok(())
}

#[test]
fn resource_missing_from_other_root_is_installed() -> Result<()> {
    let a = TempDir::new()?;
    let b = TempDir::new()?;
    let out = TempDir::new()?;
    write_file(a.path(), "bar.utc", &utc_bytes(10, None));
    write_file(b.path(), "keep.txt", b"same");
    write_file(a.path(), "keep.txt", b"same");

    let config = DiffConfig::default();
    let mut writer = IncrementalPatchWriter::new(out.path(), &config)?;
    let report = DiffEngine::new(config).run(&roots(a.path(), b.path()), Some(&mut writer))?;
    writer.finalize()?;

    assert_eq!(report.outcome, DiffOutcome::Different);
    assert_eq!(report.uniques.len(), 1);
    assert_eq!(report.uniques[0].identifier, "bar.utc");
    assert_eq!(report.uniques[0].root_index, 0);
    assert_eq!(
        writer.install_folders().files_in("Override"),
        Some(&["bar.utc".to_string()][..])
    );
    assert_eq!(fs::read(out.path().join("bar.utc"))?, utc_bytes(10, None));
    Ok(())
}

#[test]
fn new_talk_table_entries_are_staged_as_appends() -> Result<()> {
    let a = TempDir::new()?;
    let b = TempDir::new()?;
    let out = TempDir::new()?;
    write_file(a.path(), "dialog.tlk", &tlk_bytes(&["zero", "one", "two"]));
    write_file(
        b.path(),
        "dialog.tlk",
        &tlk_bytes(&["zero", "one", "two", "three", "four"]),
    );

    let config = DiffConfig::default();
    let mut writer = IncrementalPatchWriter::new(out.path(), &config)?;
    let report = DiffEngine::new(config).run(&roots(a.path(), b.path()), Some(&mut writer))?;
    let summary = writer.finalize()?;

    assert_eq!(report.outcome, DiffOutcome::Different);
    assert_eq!(summary.tlk, 1);

    let staged = Tlk::parse(&fs::read(out.path().join("append.tlk"))?)?;
    let texts: Vec<&str> = staged.entries.iter().map(|e| e.text.as_str()).collect();
    assert_eq!(texts, vec!["three", "four"]);

    let tokens: Vec<usize> = writer.modifications().tlk[0]
        .modifiers
        .iter()
        .map(|m| m.token_id)
        .collect();
    assert_eq!(tokens, vec![0, 1]);
    assert!(writer.modifications().tlk[0].modifiers.iter().all(|m| !m.is_replacement));
    assert_eq!(
        writer.install_folders().files_in("."),
        Some(&["append.tlk".to_string()][..])
    );
    Ok(())
}

#[test]
fn missing_roots_fail_before_collection() -> Result<()> {
    let dir = TempDir::new()?;
    let missing_a = dir.path().join("missing_a");
    let missing_b = dir.path().join("missing_b");

    let engine = DiffEngine::new(DiffConfig::default());
    let result = engine.run(&roots(&missing_a, &missing_b), None);

    assert!(matches!(result, Err(Error::PathNotFound(path)) if path == missing_a));
    assert_eq!(engine.compare(&roots(&missing_a, &missing_b), None), None);
    assert_eq!(fs::read_dir(dir.path())?.count(), 0);
    Ok(())
}

#[test]
fn identical_bytes_skip_the_analyzer() {
    let engine = DiffEngine::new(DiffConfig::default());
    let garbage = b"not a table at all".to_vec();
    let ctx = DiffContext::new("foo.2da", "foo.2da", "2da");

    assert_eq!(engine.diff_data(&garbage, &garbage, &ctx), ResourceDiff::Identical);
}

#[test]
fn diff_data_is_deterministic() {
    let engine = DiffEngine::new(DiffConfig::default());
    let ctx = DiffContext::new("bar.utc", "bar.utc", "utc");
    let a = utc_bytes(10, None);
    let b = utc_bytes(20, Some(5));

    let first = engine.diff_data(&a, &b, &ctx);
    let second = engine.diff_data(&a, &b, &ctx);
    assert_eq!(first, second);

    let ResourceDiff::Structured(kotordiff::Modification::Gff(gff)) = &first else {
        panic!("expected a GFF modification, got {first:?}");
    };
    assert_eq!(
        gff.modifiers,
        vec![
            ModifyGff::ModifyField {
                path: "HitPoints".to_string(),
                value: GffValue::Int16(20),
            },
            ModifyGff::AddField {
                identifier: "bar.utc_addfield_0".to_string(),
                label: "Gold".to_string(),
                path: String::new(),
                value: GffValue::Int32(5),
            },
        ]
    );
}

#[test]
fn unparseable_structured_data_is_different_without_modification() {
    let engine = DiffEngine::new(DiffConfig::default());
    let ctx = DiffContext::new("foo.2da", "foo.2da", "2da");

    assert_eq!(
        engine.diff_data(b"garbage one", b"garbage two", &ctx),
        ResourceDiff::Different(DiffReason::Unrepresentable)
    );
}

#[test]
fn text_and_binary_fallbacks() {
    let engine = DiffEngine::new(DiffConfig::default());

    let txt = DiffContext::new("a.txt", "a.txt", "txt");
    assert_eq!(
        engine.diff_data(b"one\r\ntwo\r\n", b"one\ntwo\n", &txt),
        ResourceDiff::Identical
    );
    assert_eq!(
        engine.diff_data(b"one\ntwo\n", b"one\nthree\n", &txt),
        ResourceDiff::Different(DiffReason::Text)
    );

    // 二进制格式即使内容像文本也只做哈希比较
    let ncs = DiffContext::new("k_ai.ncs", "k_ai.ncs", "ncs");
    assert_eq!(
        engine.diff_data(b"one\ntwo\n", b"one\ntwo", &ncs),
        ResourceDiff::Different(DiffReason::Hash)
    );

    let mut config = DiffConfig::default();
    config.compare_hashes = false;
    let no_hash = DiffEngine::new(config);
    assert_eq!(
        no_hash.diff_data(&[0, 1, 2], &[0, 1, 3], &ncs),
        ResourceDiff::Identical
    );
}

#[test]
fn capsule_comparison_is_symmetric() -> Result<()> {
    let a = capsule_bytes(
        CapsuleKind::Mod,
        &[
            ("foo", "2da", twoda_bytes(2)),
            ("shared", "txt", b"same".to_vec()),
            ("only_a", "utc", utc_bytes(1, None)),
        ],
    );
    let b = capsule_bytes(
        CapsuleKind::Mod,
        &[
            ("shared", "txt", b"same".to_vec()),
            ("foo", "2da", twoda_bytes(3)),
            ("only_b", "utc", utc_bytes(2, None)),
        ],
    );

    let engine = DiffEngine::new(DiffConfig::default());
    let ab = engine.compare_capsules(&a, &b, "danm13.mod")?;
    let ba = engine.compare_capsules(&b, &a, "danm13.mod")?;

    assert_eq!(ab.differing, vec!["foo.2da".to_string()]);
    assert_eq!(ab.differing, ba.differing);
    let names = |entries: &[kotordiff::diff::CapsuleEntry]| -> Vec<String> {
        entries.iter().map(|e| e.name.clone()).collect()
    };
    assert_eq!(names(&ab.only_in_a), vec!["only_a.utc".to_string()]);
    assert_eq!(names(&ab.only_in_a), names(&ba.only_in_b));
    assert_eq!(names(&ab.only_in_b), names(&ba.only_in_a));
    assert_eq!(ab.modifications.len(), 1);
    Ok(())
}

#[test]
fn capsule_members_install_into_the_capsule() -> Result<()> {
    let a = TempDir::new()?;
    let b = TempDir::new()?;
    write_file(
        a.path(),
        "danm13.mod",
        &capsule_bytes(CapsuleKind::Mod, &[("foo", "2da", twoda_bytes(2))]),
    );
    write_file(
        b.path(),
        "danm13.mod",
        &capsule_bytes(
            CapsuleKind::Mod,
            &[("foo", "2da", twoda_bytes(3)), ("extra", "utc", utc_bytes(1, None))],
        ),
    );

    let report = DiffEngine::new(DiffConfig::default()).run(&roots(a.path(), b.path()), None)?;

    assert_eq!(report.outcome, DiffOutcome::Different);
    assert_eq!(report.modifications.twoda.len(), 1);
    assert_eq!(
        report.modifications.twoda[0].destination.as_deref(),
        Some("modules\\danm13.mod")
    );
    assert_eq!(report.uniques.len(), 1);
    assert_eq!(report.uniques[0].identifier, "danm13.mod/extra.utc");
    assert_eq!(report.uniques[0].root_index, 1);
    assert_eq!(
        report.uniques[0].install.install_target(),
        ("modules\\danm13.mod".to_string(), "extra.utc".to_string())
    );
    Ok(())
}

#[test]
fn filters_limit_compared_resources() -> Result<()> {
    let a = TempDir::new()?;
    let b = TempDir::new()?;
    write_file(a.path(), "foo.2da", &twoda_bytes(2));
    write_file(b.path(), "foo.2da", &twoda_bytes(3));
    write_file(a.path(), "sub/bar.2da", &twoda_bytes(2));
    write_file(b.path(), "sub/bar.2da", &twoda_bytes(4));

    let engine = DiffEngine::new(DiffConfig::default()).with_filters(vec!["FOO.2DA".to_string()]);
    let report = engine.run(&roots(a.path(), b.path()), None)?;

    assert_eq!(report.groups, 1);
    assert_eq!(report.modifications.twoda.len(), 1);
    assert_eq!(report.modifications.twoda[0].source_file, "foo.2da");

    let engine = DiffEngine::new(DiffConfig::default()).with_filters(vec!["sub".to_string()]);
    let report = engine.run(&roots(a.path(), b.path()), None)?;
    assert_eq!(report.modifications.twoda.len(), 1);
    assert_eq!(report.modifications.twoda[0].source_file, "bar.2da");
    Ok(())
}

#[test]
fn cancelled_run_is_indeterminate() -> Result<()> {
    let a = TempDir::new()?;
    let b = TempDir::new()?;
    write_file(a.path(), "foo.2da", &twoda_bytes(2));
    write_file(b.path(), "foo.2da", &twoda_bytes(3));

    let token = CancelToken::new();
    token.cancel();
    let engine = DiffEngine::new(DiffConfig::default()).with_cancel_token(token);

    let report = engine.run(&roots(a.path(), b.path()), None)?;
    assert_eq!(report.outcome, DiffOutcome::Indeterminate);
    assert_eq!(report.groups, 0);
    assert_eq!(engine.compare(&roots(a.path(), b.path()), None), None);
    Ok(())
}

fn make_installation(root: &Path, module_hp: i16) {
    write_file(root, "chitin.key", b"KEY V1  ");
    write_file(root, "dialog.tlk", &tlk_bytes(&["hello"]));
    write_file(root, "Override/foo.2da", &twoda_bytes(2));
    write_file(
        root,
        "Modules/danm13.rim",
        &capsule_bytes(CapsuleKind::Rim, &[("m13aa", "utc", utc_bytes(module_hp, None))]),
    );
}

#[test]
fn installation_walk_covers_override_talktable_and_modules() -> Result<()> {
    let dir = TempDir::new()?;
    make_installation(dir.path(), 10);

    let info = PathInfo::resolve(&RootInput::from(dir.path()), 0)?;
    assert!(info.is_installation());

    let identifiers: Vec<String> = walk(&info).map(|r| r.identifier).collect();
    assert_eq!(
        identifiers,
        vec![
            "foo.2da".to_string(),
            "dialog.tlk".to_string(),
            "modules/danm13/m13aa.utc".to_string(),
        ]
    );
    let destinations: Vec<Option<String>> = walk(&info).map(|r| r.destination).collect();
    assert_eq!(
        destinations,
        vec![
            Some("Override".to_string()),
            None,
            Some("modules\\danm13.mod".to_string()),
        ]
    );
    Ok(())
}

#[test]
fn installation_module_changes_target_the_module() -> Result<()> {
    let a = TempDir::new()?;
    let b = TempDir::new()?;
    make_installation(a.path(), 10);
    make_installation(b.path(), 25);

    let engine = DiffEngine::new(DiffConfig::default()).with_filters(vec!["danm13".to_string()]);
    let report = engine.run(&roots(a.path(), b.path()), None)?;

    assert_eq!(report.groups, 1);
    assert_eq!(report.modifications.gff.len(), 1);
    let gff = &report.modifications.gff[0];
    assert_eq!(gff.source_file, "m13aa.utc");
    assert_eq!(gff.destination.as_deref(), Some("modules\\danm13.mod"));
    Ok(())
}

#[test]
fn destination_follows_identifier_location() {
    assert_eq!(destination_for("bar.utc"), "Override");
    assert_eq!(destination_for("override/sub/bar.utc"), "Override");
    assert_eq!(destination_for("modules/danm13.rim/m13aa.utc"), "modules\\danm13.mod");
    assert_eq!(destination_for("modules/danm13_dlg.erf/carth.dlg"), "modules\\danm13.mod");
    assert_eq!(destination_for("modules/extra.erf/x.utc"), "modules\\extra.erf");
    assert_eq!(destination_for("modules/readme.txt"), "modules");
    assert_eq!(destination_for("lips/n_test.lip"), "Lips");
    assert_eq!(destination_for("StreamVoice/a/b.wav"), "StreamWaves");
    assert_eq!(destination_for("dialog.tlk"), ".");
}

#[test]
fn override_subfolders_still_install_to_override() -> Result<()> {
    let a = TempDir::new()?;
    let b = TempDir::new()?;
    make_installation(a.path(), 10);
    make_installation(b.path(), 10);
    write_file(b.path(), "Override/lips/n_test.lip", b"lip data");
    write_file(b.path(), "Override/streamwaves/n_test.wav", b"wav data");

    let report = DiffEngine::new(DiffConfig::default()).run(&roots(a.path(), b.path()), None)?;

    let targets: Vec<(String, String)> = report
        .uniques
        .iter()
        .map(|u| u.install.install_target())
        .collect();
    assert_eq!(
        targets,
        vec![
            ("Override".to_string(), "n_test.lip".to_string()),
            ("Override".to_string(), "n_test.wav".to_string()),
        ]
    );
    Ok(())
}

#[test]
fn installation_mod_overrides_its_rim() -> Result<()> {
    let a = TempDir::new()?;
    let b = TempDir::new()?;
    make_installation(a.path(), 10);
    make_installation(b.path(), 10);
    write_file(
        b.path(),
        "Modules/danm13.mod",
        &capsule_bytes(CapsuleKind::Mod, &[("m13aa", "utc", utc_bytes(25, None))]),
    );

    let report = DiffEngine::new(DiffConfig::default()).run(&roots(a.path(), b.path()), None)?;

    assert_eq!(report.modifications.gff.len(), 1);
    let gff = &report.modifications.gff[0];
    assert_eq!(gff.source_file, "m13aa.utc");
    assert_eq!(gff.destination.as_deref(), Some("modules\\danm13.mod"));
    assert_eq!(
        gff.modifiers,
        vec![ModifyGff::ModifyField {
            path: "HitPoints".to_string(),
            value: GffValue::Int16(25),
        }]
    );
    Ok(())
}

fn module_set(root: &Path) {
    write_file(
        root,
        "danm13.rim",
        &capsule_bytes(CapsuleKind::Rim, &[("m13aa", "utc", utc_bytes(10, None))]),
    );
    // 与 .rim 重名的资源以 .rim 为准
    write_file(
        root,
        "danm13_s.rim",
        &capsule_bytes(
            CapsuleKind::Rim,
            &[("m13aa", "utc", utc_bytes(99, None)), ("p_bastila", "utc", utc_bytes(5, None))],
        ),
    );
}

fn module_mod(root: &Path) {
    write_file(
        root,
        "danm13.mod",
        &capsule_bytes(
            CapsuleKind::Mod,
            &[
                ("m13aa", "utc", utc_bytes(10, None)),
                ("p_bastila", "utc", utc_bytes(30, None)),
                ("new", "utc", utc_bytes(1, None)),
            ],
        ),
    );
}

fn assert_module_set_result(report: &kotordiff::DiffReport, unique: &str) {
    assert_eq!(report.outcome, DiffOutcome::Different);
    assert_eq!(report.modifications.gff.len(), 1);
    let gff = &report.modifications.gff[0];
    assert_eq!(gff.source_file, "p_bastila.utc");
    assert_eq!(gff.destination.as_deref(), Some("modules\\danm13.mod"));

    assert_eq!(report.uniques.len(), 1);
    assert_eq!(report.uniques[0].identifier, unique);
    assert_eq!(report.uniques[0].root_index, 1);
    assert_eq!(
        report.uniques[0].install.install_target(),
        ("modules\\danm13.mod".to_string(), "new.utc".to_string())
    );
}

#[test]
fn rim_set_in_folder_is_compared_against_mod() -> Result<()> {
    let a = TempDir::new()?;
    let b = TempDir::new()?;
    module_set(a.path());
    module_mod(b.path());

    let report = DiffEngine::new(DiffConfig::default()).run(&roots(a.path(), b.path()), None)?;

    assert_eq!(report.groups, 1);
    assert_module_set_result(&report, "danm13.mod/new.utc");
    Ok(())
}

#[test]
fn rim_file_root_pulls_in_its_companions() -> Result<()> {
    let a = TempDir::new()?;
    let b = TempDir::new()?;
    module_set(a.path());
    module_mod(b.path());

    let roots = vec![
        RootInput::from(a.path().join("danm13.rim").as_path()),
        RootInput::from(b.path().join("danm13.mod").as_path()),
    ];
    let report = DiffEngine::new(DiffConfig::default()).run(&roots, None)?;

    assert_eq!(report.groups, 3);
    assert_module_set_result(&report, "new.utc");
    Ok(())
}

#[test]
fn huge_declared_table_row_count_is_different() {
    let engine = DiffEngine::new(DiffConfig::default());
    let ctx = DiffContext::new("foo.2da", "foo.2da", "2da");
    let mut a = b"2DA V2.b\nname\t\0".to_vec();
    a.extend_from_slice(&0xFFFF_FFFFu32.to_le_bytes());
    let mut b = a.clone();
    a.push(0);
    b.push(1);

    assert!(matches!(
        engine.diff_data(&a, &b, &ctx),
        ResourceDiff::Different(_)
    ));
}

fn table(headers: &[&str], rows: &[(&str, &[&str])]) -> Vec<u8> {
    let mut table = TwoDa::new(headers.iter().map(|h| h.to_string()).collect());
    for (label, cells) in rows {
        table.push_row(*label, cells.iter().map(|c| c.to_string()).collect());
    }
    table.to_bytes().unwrap()
}

fn table_modifiers(diff: ResourceDiff) -> Vec<Modify2Da> {
    match diff {
        ResourceDiff::Structured(kotordiff::Modification::TwoDa(m)) => m.modifiers,
        other => panic!("expected a 2DA modification, got {other:?}"),
    }
}

#[test]
fn changed_cells_use_numeric_labels_or_row_position() {
    let engine = DiffEngine::new(DiffConfig::default());
    let ctx = DiffContext::new("foo.2da", "foo.2da", "2da");
    let old = table(&["name", "cost"], &[("7", &["a", "1"]), ("boss", &["b", "2"])]);
    let new = table(&["name", "cost"], &[("7", &["a", "5"]), ("boss", &["b", "8"])]);

    assert_eq!(
        table_modifiers(engine.diff_data(&old, &new, &ctx)),
        vec![
            Modify2Da::ChangeRow {
                identifier: "foo.2da_changerow_0".to_string(),
                row_index: 7,
                cells: vec![("cost".to_string(), "5".to_string())],
            },
            Modify2Da::ChangeRow {
                identifier: "foo.2da_changerow_1".to_string(),
                row_index: 1,
                cells: vec![("cost".to_string(), "8".to_string())],
            },
        ]
    );
}

#[test]
fn added_column_infers_default_for_existing_rows() {
    let engine = DiffEngine::new(DiffConfig::default());
    let ctx = DiffContext::new("foo.2da", "foo.2da", "2da");
    let old = table(
        &["name"],
        &[("0", &["a"]), ("1", &["b"]), ("2", &["c"]), ("3", &["d"])],
    );
    let new = table(
        &["name", "speed"],
        &[
            ("0", &["a", "1"]),
            ("1", &["b", "1"]),
            ("2", &["c", "1"]),
            ("3", &["d", "9"]),
            ("4", &["e", "9"]),
        ],
    );

    assert_eq!(
        table_modifiers(engine.diff_data(&old, &new, &ctx)),
        vec![
            Modify2Da::AddColumn {
                identifier: "foo.2da_speed_addcol_0".to_string(),
                header: "speed".to_string(),
                default: "1".to_string(),
                index_insert: [(3, "9".to_string())].into_iter().collect(),
            },
            Modify2Da::AddRow {
                identifier: "foo.2da_addrow_0".to_string(),
                row_label: "4".to_string(),
                cells: vec![
                    ("name".to_string(), "e".to_string()),
                    ("speed".to_string(), "9".to_string()),
                ],
            },
        ]
    );
}

#[test]
fn removed_rows_keep_other_changes() {
    let engine = DiffEngine::new(DiffConfig::default());
    let ctx = DiffContext::new("foo.2da", "foo.2da", "2da");
    let old = table(
        &["name", "cost"],
        &[("0", &["a", "1"]), ("1", &["b", "2"]), ("2", &["c", "3"])],
    );

    let removed_only = table(&["name", "cost"], &[("0", &["a", "1"]), ("1", &["b", "2"])]);
    assert_eq!(
        engine.diff_data(&old, &removed_only, &ctx),
        ResourceDiff::Different(DiffReason::Unrepresentable)
    );

    let removed_and_changed = table(&["name", "cost"], &[("0", &["a", "1"]), ("1", &["b", "20"])]);
    assert_eq!(
        table_modifiers(engine.diff_data(&old, &removed_and_changed, &ctx)),
        vec![Modify2Da::ChangeRow {
            identifier: "foo.2da_changerow_0".to_string(),
            row_index: 1,
            cells: vec![("cost".to_string(), "20".to_string())],
        }]
    );
}
