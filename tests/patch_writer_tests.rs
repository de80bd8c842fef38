use anyhow::Result;
use kotordiff::formats::{Gff, GffStruct, GffValue, LocalizedString, Ssf, Tlk, TwoDa};
use kotordiff::mods::{
    InstallFile, Modification, Modifications2Da, ModificationsGff, ModificationsNcs,
    ModificationsSsf, ModificationsTlk, Modify2Da, ModifyGff, ModifySsf, ModifyTlk,
};
use kotordiff::config::DiffFormat;
use kotordiff::tslpatch::PatchMaterializer;
use kotordiff::{DiffConfig, Error, IncrementalPatchWriter, determine_install_folders};
use pretty_assertions::assert_eq;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const DATE: &str = "01/02/2026";

fn write_file(root: &Path, relative: &str, contents: &[u8]) -> PathBuf {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, contents).unwrap();
    path
}

fn new_writer(dir: &Path, config: &DiffConfig) -> Result<IncrementalPatchWriter> {
    Ok(IncrementalPatchWriter::new(dir, config)?.with_date(DATE)?)
}

/// 取出某个段落的键值行
fn section(ini: &str, name: &str) -> Vec<String> {
    let header = format!("[{name}]");
    ini.lines()
        .skip_while(|line| *line != header)
        .skip(1)
        .take_while(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

fn tlk_append(save_as: &str, texts: &[&str]) -> Modification {
    let mut m = ModificationsTlk::new(save_as);
    for (i, text) in texts.iter().enumerate() {
        m.modifiers.push(ModifyTlk::append(i, 100 + i, *text, ""));
    }
    Modification::Tlk(m)
}

fn table_change(source: &str) -> Modification {
    let mut m = Modifications2Da::new(source);
    m.modifiers.push(Modify2Da::ChangeRow {
        identifier: format!("{source}_changerow_0"),
        row_index: 3,
        cells: vec![("cost".to_string(), "99".to_string())],
    });
    Modification::TwoDa(m)
}

fn twoda_bytes(rows: usize) -> Vec<u8> {
    let mut table = TwoDa::new(vec!["name".to_string(), "cost".to_string()]);
    for i in 0..rows {
        table.push_row(i.to_string(), vec![format!("item{i}"), i.to_string()]);
    }
    table.to_bytes().unwrap()
}

#[test]
fn skeleton_has_fixed_header_and_section_order() -> Result<()> {
    let out = TempDir::new()?;
    let writer = new_writer(out.path(), &DiffConfig::default())?;

    let expected = concat!(
        "; ============================================================================\n",
        ";  TSLPatcher Modifications File - Generated by KotorDiff (01/02/2026)\n",
        "; ============================================================================\n",
        ";\n",
        ";  This file is machine-generated and TSLPatcher-compliant.\n",
        ";  Blank lines and comments may be added between sections, never inside one.\n",
        "; ============================================================================\n",
        "\n",
        "[Settings]\n",
        "FileExists=1\n",
        "WindowCaption=Mod Installer\n",
        "ConfirmMessage=Install this mod?\n",
        "LogLevel=3\n",
        "InstallerMode=1\n",
        "BackupFiles=1\n",
        "PlaintextLog=0\n",
        "LookupGameFolder=0\n",
        "LookupGameNumber=1\n",
        "SaveProcessedScripts=0\n",
        "\n",
        "[TLKList]\n",
        "\n",
        "[InstallList]\n",
        "\n",
        "[2DAList]\n",
        "\n",
        "[GFFList]\n",
        "\n",
        "[CompileList]\n",
        "\n",
        "[SSFList]\n",
        "\n",
    );
    assert_eq!(fs::read_to_string(writer.ini_path())?, expected);
    assert_eq!(writer.ini_path(), out.path().join("changes.ini"));
    Ok(())
}

#[test]
fn writer_creates_missing_output_directory() -> Result<()> {
    let dir = TempDir::new()?;
    let out = dir.path().join("nested/tslpatchdata");
    let mut config = DiffConfig::default();
    config.ini_filename = "patch.ini".to_string();

    let writer = IncrementalPatchWriter::new(&out, &config)?;
    assert!(writer.ini_path().is_file());
    assert_eq!(writer.ini_path(), out.join("patch.ini"));
    Ok(())
}

#[test]
fn talk_table_tokens_increase_across_modifications() -> Result<()> {
    let out = TempDir::new()?;
    let mut writer = new_writer(out.path(), &DiffConfig::default())?;

    writer.add_modification(&tlk_append("dialog.tlk", &["a", "b"]))?;
    writer.add_modification(&tlk_append("other.tlk", &["c", "d"]))?;
    // 同名字符串表只记录一次
    writer.add_modification(&tlk_append("DIALOG.TLK", &["e"]))?;
    writer.flush()?;

    let tokens: Vec<usize> = writer
        .modifications()
        .tlk
        .iter()
        .flat_map(|m| m.modifiers.iter().map(|t| t.token_id))
        .collect();
    assert_eq!(tokens, vec![0, 1, 2, 3]);

    let staged = Tlk::parse(&fs::read(out.path().join("append.tlk"))?)?;
    let texts: Vec<&str> = staged.entries.iter().map(|e| e.text.as_str()).collect();
    assert_eq!(texts, vec!["a", "b", "c", "d"]);

    let ini = fs::read_to_string(writer.ini_path())?;
    assert_eq!(
        section(&ini, "TLKList"),
        vec!["StrRef0=0", "StrRef1=1", "StrRef2=2", "StrRef3=3"]
    );
    assert_eq!(section(&ini, "InstallList"), vec!["install_folder0=."]);
    assert_eq!(section(&ini, "install_folder0"), vec!["File0=append.tlk"]);
    Ok(())
}

#[test]
fn flush_without_changes_is_idempotent() -> Result<()> {
    let out = TempDir::new()?;
    let mut writer = new_writer(out.path(), &DiffConfig::default())?;
    writer.add_modification(&table_change("appearance.2da"))?;

    writer.flush()?;
    let first = fs::read(writer.ini_path())?;
    for _ in 0..3 {
        writer.flush()?;
        assert_eq!(fs::read(writer.ini_path())?, first);
    }
    assert_eq!(writer.render_ini().into_bytes(), first);
    Ok(())
}

#[test]
fn writes_are_batched_until_threshold() -> Result<()> {
    let out = TempDir::new()?;
    let mut config = DiffConfig::default();
    config.batch_size = 2;
    let mut writer = new_writer(out.path(), &config)?;

    writer.add_modification(&table_change("a.2da"))?;
    let ini = fs::read_to_string(writer.ini_path())?;
    assert!(section(&ini, "2DAList").is_empty());

    writer.add_modification(&table_change("b.2da"))?;
    let ini = fs::read_to_string(writer.ini_path())?;
    assert_eq!(section(&ini, "2DAList"), vec!["Table0=a.2da", "Table1=b.2da"]);
    Ok(())
}

#[test]
fn repeated_source_file_is_recorded_once() -> Result<()> {
    let out = TempDir::new()?;
    let mut writer = new_writer(out.path(), &DiffConfig::default())?;

    writer.add_modification(&table_change("appearance.2da"))?;
    writer.add_modification(&table_change("Appearance.2DA"))?;
    let summary = writer.finalize()?;

    assert_eq!(summary.twoda, 1);
    assert_eq!(summary.install_files, 1);
    assert_eq!(summary.install_folders, 1);
    Ok(())
}

#[test]
fn incremental_folder_map_matches_rebuild() -> Result<()> {
    let out = TempDir::new()?;
    let mut writer = new_writer(out.path(), &DiffConfig::default())?;

    let mut module_table = Modifications2Da::new("spells.2da");
    module_table.destination = Some("modules\\danm13.mod".to_string());
    writer.add_modification(&Modification::TwoDa(module_table))?;
    writer.add_modification(&table_change("appearance.2da"))?;
    writer.add_modification(&tlk_append("dialog.tlk", &["x"]))?;
    writer.add_modification(&Modification::Ssf(ModificationsSsf::new("c_bastila.ssf")))?;
    writer.add_modification(&Modification::Ncs(ModificationsNcs::new("k_ai.ncs")))?;
    writer.add_install_file(&InstallFile::new("bar.utc", None), Some(b"data"))?;
    writer.add_install_file(&InstallFile::new("BAR.UTC", None), Some(b"data"))?;
    let summary = writer.finalize()?;

    let rebuilt = determine_install_folders(writer.modifications());
    assert!(rebuilt.same_entries(writer.install_folders()));
    assert_eq!(summary.ncs, 1);
    assert_eq!(summary.install_files, 5);
    assert_eq!(summary.install_folders, 3);

    let ini = fs::read_to_string(writer.ini_path())?;
    assert!(section(&ini, "CompileList").is_empty());
    Ok(())
}

#[test]
fn table_and_sound_sections_use_installer_keys() -> Result<()> {
    let out = TempDir::new()?;
    let mut writer = new_writer(out.path(), &DiffConfig::default())?;

    let mut table = Modifications2Da::new("foo.2da");
    table.modifiers = vec![
        Modify2Da::ChangeRow {
            identifier: "foo.2da_changerow_0".to_string(),
            row_index: 2,
            cells: vec![("cost".to_string(), "7".to_string())],
        },
        Modify2Da::AddColumn {
            identifier: "foo.2da_weight_addcol_0".to_string(),
            header: "weight".to_string(),
            default: "****".to_string(),
            index_insert: BTreeMap::from([(1, "3".to_string())]),
        },
        Modify2Da::AddRow {
            identifier: "foo.2da_addrow_0".to_string(),
            row_label: "5".to_string(),
            cells: vec![
                ("name".to_string(), "item5".to_string()),
                ("cost".to_string(), String::new()),
            ],
        },
    ];
    writer.add_modification(&Modification::TwoDa(table))?;

    let mut sounds = ModificationsSsf::new("c_bastila.ssf");
    sounds.modifiers = vec![
        ModifySsf {
            sound: 0,
            stringref: 123,
        },
        ModifySsf {
            sound: 15,
            stringref: 456,
        },
    ];
    writer.add_modification(&Modification::Ssf(sounds))?;
    writer.finalize()?;

    let ini = fs::read_to_string(writer.ini_path())?;
    assert_eq!(section(&ini, "2DAList"), vec!["Table0=foo.2da"]);
    assert_eq!(
        section(&ini, "foo.2da"),
        vec![
            "ChangeRow0=foo.2da_changerow_0",
            "AddColumn0=foo.2da_weight_addcol_0",
            "AddRow0=foo.2da_addrow_0",
        ]
    );
    assert_eq!(section(&ini, "foo.2da_changerow_0"), vec!["RowIndex=2", "cost=7"]);
    assert_eq!(
        section(&ini, "foo.2da_weight_addcol_0"),
        vec!["ColumnLabel=weight", "DefaultValue=****", "I1=3"]
    );
    assert_eq!(
        section(&ini, "foo.2da_addrow_0"),
        vec!["RowLabel=5", "name=item5"]
    );
    assert_eq!(section(&ini, "SSFList"), vec!["File0=c_bastila.ssf"]);
    assert_eq!(
        section(&ini, "c_bastila.ssf"),
        vec!["Battlecry 1=123", "Death=456"]
    );

    // 没有基础文件时生成空音效集
    let staged = Ssf::parse(&fs::read(out.path().join("c_bastila.ssf"))?)?;
    assert_eq!(staged, Ssf::default());
    assert!(!out.path().join("foo.2da").exists());
    Ok(())
}

#[test]
fn gff_sections_nest_added_fields() -> Result<()> {
    let out = TempDir::new()?;
    let mut writer = new_writer(out.path(), &DiffConfig::default())?;

    let mut name = LocalizedString::from_stringref(-1);
    name.substrings.insert(0, "Line one\nLine two".to_string());

    let mut gff = ModificationsGff::new("bar.utc");
    gff.modifiers = vec![
        ModifyGff::ModifyField {
            path: "HitPoints".to_string(),
            value: GffValue::Int16(20),
        },
        ModifyGff::ModifyField {
            path: "ItemList\\0\\Position".to_string(),
            value: GffValue::Vector3([1.0, 2.5, 0.0]),
        },
        ModifyGff::ModifyLocString {
            path: "FirstName".to_string(),
            stringref: Some(42),
            substrings: BTreeMap::from([(0, "Bar".to_string())]),
        },
        ModifyGff::AddField {
            identifier: "bar.utc_addfield_0".to_string(),
            label: "Nickname".to_string(),
            path: String::new(),
            value: GffValue::LocString(name),
        },
        ModifyGff::AddStructToList {
            identifier: "bar.utc_addstruct_1".to_string(),
            path: "ItemList".to_string(),
            value: GffStruct::new(7).with("InventoryRes", GffValue::ResRef("g_w_blstrpstl01".to_string())),
        },
    ];
    writer.add_modification(&Modification::Gff(gff))?;
    writer.finalize()?;

    let ini = fs::read_to_string(writer.ini_path())?;
    assert_eq!(section(&ini, "GFFList"), vec!["File0=bar.utc"]);
    assert_eq!(
        section(&ini, "bar.utc"),
        vec![
            "HitPoints=20",
            "ItemList\\0\\Position=1|2.5|0",
            "FirstName(strref)=42",
            "FirstName(lang0)=Bar",
            "AddField0=bar.utc_addfield_0",
            "AddField1=bar.utc_addstruct_1",
        ]
    );
    assert_eq!(
        section(&ini, "bar.utc_addfield_0"),
        vec![
            "FieldType=ExoLocString",
            "Label=Nickname",
            "Path=",
            "StrRef=-1",
            "lang0=Line one<#LF#>Line two",
        ]
    );
    assert_eq!(
        section(&ini, "bar.utc_addstruct_1"),
        vec![
            "FieldType=Struct",
            "Label=",
            "Path=ItemList",
            "TypeId=7",
            "AddField0=bar.utc_addstruct_1_0",
        ]
    );
    assert_eq!(
        section(&ini, "bar.utc_addstruct_1_0"),
        vec![
            "FieldType=ResRef",
            "Label=InventoryRes",
            "Value=g_w_blstrpstl01",
        ]
    );
    Ok(())
}

#[test]
fn base_resources_are_restaged_through_format_writers() -> Result<()> {
    let out = TempDir::new()?;
    let base = TempDir::new()?;
    write_file(base.path(), "override/appearance.2da", &twoda_bytes(4));

    let mut writer = new_writer(out.path(), &DiffConfig::default())?.with_base_data(base.path());
    writer.add_modification_with_base(&table_change("spells.2da"), Some(&twoda_bytes(2)))?;
    writer.add_modification(&table_change("appearance.2da"))?;
    writer.finalize()?;

    let spells = TwoDa::parse(&fs::read(out.path().join("spells.2da"))?)?;
    assert_eq!(spells.rows.len(), 2);
    let appearance = TwoDa::parse(&fs::read(out.path().join("appearance.2da"))?)?;
    assert_eq!(appearance.rows.len(), 4);
    Ok(())
}

#[test]
fn materializer_finds_base_inside_module_capsule() -> Result<()> {
    let base = TempDir::new()?;
    let out = TempDir::new()?;

    let mut gff = Gff::new("UTC ");
    gff.root.set("Tag", GffValue::String("m13".to_string()));
    let mut capsule = kotordiff::formats::Capsule::new(kotordiff::formats::CapsuleKind::Mod);
    capsule.push("m13aa", "utc", gff.to_bytes()?);
    write_file(base.path(), "Modules/danm13.mod", &capsule.to_bytes()?);

    let materializer = PatchMaterializer::new(out.path()).with_base_data(base.path());
    let found = materializer.find_base("modules\\danm13.mod", "m13aa.utc");
    assert_eq!(found, Some(gff.to_bytes()?));
    assert_eq!(materializer.find_base("Override", "missing.utc"), None);
    Ok(())
}

#[test]
fn materializer_falls_back_to_module_rims() -> Result<()> {
    let base = TempDir::new()?;
    let out = TempDir::new()?;

    let mut gff = Gff::new("DLG ");
    gff.root.set("Speaker", GffValue::String("carth".to_string()));
    let mut rim = kotordiff::formats::Capsule::new(kotordiff::formats::CapsuleKind::Rim);
    rim.push("m13aa", "are", b"area".to_vec());
    write_file(base.path(), "modules/danm13.rim", &rim.to_bytes()?);
    let mut dlg = kotordiff::formats::Capsule::new(kotordiff::formats::CapsuleKind::Erf);
    dlg.push("carth", "dlg", gff.to_bytes()?);
    write_file(base.path(), "modules/danm13_dlg.erf", &dlg.to_bytes()?);

    let materializer = PatchMaterializer::new(out.path()).with_base_data(base.path());
    assert_eq!(
        materializer.find_base("modules\\danm13.mod", "carth.dlg"),
        Some(gff.to_bytes()?)
    );
    assert_eq!(
        materializer.find_base("modules\\danm13.mod", "m13aa.are"),
        Some(b"area".to_vec())
    );
    Ok(())
}

#[test]
fn config_loads_from_toml_with_defaults() -> Result<()> {
    let config = DiffConfig::from_toml(
        "batch_size = 10\ncompare_hashes = false\n\n[settings]\nwindow_caption = \"My Mod\"\n",
    )?;
    assert_eq!(config.batch_size, 10);
    assert!(!config.compare_hashes);
    assert_eq!(config.settings.window_caption, "My Mod");
    assert_eq!(config.settings.lookup_game_number, 1);
    assert_eq!(config.ini_filename, "changes.ini");
    assert_eq!(config.diff_format, DiffFormat::Default);
    assert_eq!(
        DiffConfig::from_toml("diff_format = \"side_by_side\"")?.diff_format,
        DiffFormat::SideBySide
    );

    let dir = TempDir::new()?;
    let path = write_file(dir.path(), "kotordiff.toml", b"tool_name = \"Patcher\"\n");
    assert_eq!(DiffConfig::load(&path)?.tool_name, "Patcher");

    assert!(matches!(
        DiffConfig::from_toml("unknown_key = 1"),
        Err(Error::Config(_))
    ));
    Ok(())
}

#[test]
fn generate_all_files_stages_from_base_data() -> Result<()> {
    let out = TempDir::new()?;
    let base = TempDir::new()?;
    write_file(base.path(), "Override/appearance.2da", &twoda_bytes(3));
    write_file(base.path(), "Override/bar.utc", b"raw creature");

    let mut modifications = kotordiff::ModificationsByType::new();
    modifications.push(table_change("appearance.2da"));
    modifications.push(tlk_append("dialog.tlk", &["hello"]));
    modifications.push(table_change("missing.2da"));
    modifications.install.push(InstallFile::new("bar.utc", None));

    let materializer = PatchMaterializer::new(out.path()).with_base_data(base.path());
    let written = materializer.generate_all_files(&modifications)?;

    assert_eq!(written, 3);
    assert!(out.path().join("append.tlk").is_file());
    assert!(out.path().join("appearance.2da").is_file());
    assert_eq!(fs::read(out.path().join("bar.utc"))?, b"raw creature");
    assert!(!out.path().join("missing.2da").exists());
    Ok(())
}
