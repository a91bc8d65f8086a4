//! Shared fixtures: generated PDFs and a config wired to the mock models.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};

/// Write a PDF with one page per entry; each line becomes a text line.
pub fn write_pdf(path: &Path, pages: &[&str]) {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids = Vec::new();
    for page in pages {
        let mut operations = Vec::new();
        for (i, line) in page.lines().enumerate() {
            let y = 780 - 14 * i as i64;
            operations.extend([
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 11.into()]),
                Operation::new("Td", vec![50.into(), y.into()]),
                Operation::new("Tj", vec![Object::string_literal(line)]),
                Operation::new("ET", vec![]),
            ]);
        }
        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.save(path).unwrap();
}

pub const REFERENCE: &str = "Examen de management\n\
Q1(5) Selon Fayol le manager planifie les ressources.\n\
Q2(10) Le controle verifie les resultats.";

pub const CONCEPTS: &str = r#"{
    "planification": ["planifi", "prevoi"],
    "controle": ["control", "verifi"]
}"#;

pub const AUTHORS: &str = r#"{
    "Fayol": ["Fayol", "Henri Fayol"],
    "Mintzberg": ["Mintzberg"]
}"#;

/// A temp directory holding reference tables, a grade store location and an
/// `answerscore.toml` that selects the mock models.
pub struct Workspace {
    pub dir: tempfile::TempDir,
}

impl Workspace {
    pub fn new(clear_score: f64) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        std::fs::write(root.join("concepts.json"), CONCEPTS).unwrap();
        std::fs::write(root.join("authors.json"), AUTHORS).unwrap();
        let config = format!(
            r#"parallelism = 2

[embedder]
type = "mock"

[classifier]
type = "mock"
clear_score = {clear_score:?}

[reference]
concepts = "{concepts}"
authors = "{authors}"

[store]
path = "{store}"
"#,
            concepts = toml_path(&root.join("concepts.json")),
            authors = toml_path(&root.join("authors.json")),
            store = toml_path(&root.join("grades.json")),
        );
        std::fs::write(root.join("answerscore.toml"), config).unwrap();
        Self { dir }
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    pub fn config(&self) -> PathBuf {
        self.path("answerscore.toml")
    }

    pub fn store(&self) -> PathBuf {
        self.path("grades.json")
    }

    pub fn pdf(&self, name: &str, pages: &[&str]) -> PathBuf {
        let path = self.path(name);
        write_pdf(&path, pages);
        path
    }
}

/// Forward slashes keep Windows paths valid inside a TOML basic string.
fn toml_path(path: &Path) -> String {
    path.display().to_string().replace('\\', "/")
}
