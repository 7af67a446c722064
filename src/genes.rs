//! Gene file format.
//!
//! A plain-text file of named sections. Each section is a `name:` line,
//! tab-indented value lines, and an `end` line:
//!
//! ```text
//! dna_dims:
//! 	120 4
//! end
//! target_img_dims:
//! 	64 48
//! end
//! scale:
//! 	0.05
//! end
//! objs_path:
//! 	stamps/a.png
//! end
//! genes:
//! 	0.25
//! 	...
//! end
//! ```
//!
//! `dna_dims` and `genes` are required. Both dimensions must be non-zero;
//! genes are listed one per line in row-major order and must number
//! `genes_x * genes_y`.

use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use crate::compute::{GeneShape, Individual};

/// Gene file errors.
#[derive(Debug, thiserror::Error)]
pub enum GeneFileError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Missing section '{0}'")]
    MissingSection(&'static str),
    #[error("Section '{0}' is not terminated by 'end'")]
    Unterminated(String),
    #[error("Line {line}: expected a section header, found '{text}'")]
    UnexpectedLine { line: usize, text: String },
    #[error("Section '{section}': cannot parse '{value}'")]
    Parse { section: &'static str, value: String },
    #[error("Expected {expected} genes for the declared shape, found {actual}")]
    GeneCount { expected: usize, actual: usize },
}

/// Contents of a gene file.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneFile {
    pub shape: GeneShape,
    /// Target image `(width, height)`, when the genes are image coordinates.
    pub target_dims: Option<(usize, usize)>,
    /// Global stamp resize factor.
    pub scale: Option<f32>,
    /// Stamp per object row, in row order.
    pub stamp_paths: Vec<String>,
    pub genes: Vec<f32>,
}

impl GeneFile {
    pub fn new(individual: &Individual) -> Self {
        Self {
            shape: individual.shape(),
            target_dims: None,
            scale: None,
            stamp_paths: Vec::new(),
            genes: individual.genes().to_vec(),
        }
    }

    /// The genes as an individual.
    pub fn individual(&self) -> Result<Individual, GeneFileError> {
        Individual::from_genes(self.shape, self.genes.clone()).ok_or(GeneFileError::GeneCount {
            expected: self.shape.len(),
            actual: self.genes.len(),
        })
    }

    pub fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        section(w, "dna_dims", [format!("{} {}", self.shape.genes_x, self.shape.genes_y)])?;
        if let Some((width, height)) = self.target_dims {
            section(w, "target_img_dims", [format!("{width} {height}")])?;
        }
        if let Some(scale) = self.scale {
            section(w, "scale", [scale.to_string()])?;
        }
        if !self.stamp_paths.is_empty() {
            section(w, "objs_path", &self.stamp_paths)?;
        }
        section(w, "genes", self.genes.iter().map(f32::to_string))
    }

    pub fn read_from<R: BufRead>(r: R) -> Result<Self, GeneFileError> {
        let sections = read_sections(r)?;
        let find = |name: &str| {
            sections
                .iter()
                .find(|(n, _)| n == name)
                .map(|(_, values)| values.as_slice())
        };

        let dims = find("dna_dims").ok_or(GeneFileError::MissingSection("dna_dims"))?;
        let (genes_x, genes_y) = parse_pair("dna_dims", dims)?;
        let shape = GeneShape::new(genes_x, genes_y);
        if shape.is_empty() {
            return Err(GeneFileError::Parse {
                section: "dna_dims",
                value: format!("{genes_x} {genes_y}"),
            });
        }

        let target_dims = find("target_img_dims")
            .map(|values| parse_pair("target_img_dims", values))
            .transpose()?;

        let scale = find("scale")
            .map(|values| {
                let value = values.first().map(String::as_str).unwrap_or_default();
                parse("scale", value)
            })
            .transpose()?;

        let stamp_paths = find("objs_path").map(<[String]>::to_vec).unwrap_or_default();

        let genes = find("genes")
            .ok_or(GeneFileError::MissingSection("genes"))?
            .iter()
            .map(|v| parse("genes", v))
            .collect::<Result<Vec<f32>, _>>()?;
        if genes.len() != shape.len() {
            return Err(GeneFileError::GeneCount {
                expected: shape.len(),
                actual: genes.len(),
            });
        }

        Ok(Self {
            shape,
            target_dims,
            scale,
            stamp_paths,
            genes,
        })
    }

    pub fn save(&self, path: impl AsRef<Path>) -> io::Result<()> {
        let mut w = BufWriter::new(File::create(path)?);
        self.write_to(&mut w)?;
        w.flush()
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, GeneFileError> {
        Self::read_from(BufReader::new(File::open(path)?))
    }
}

fn section<W, I, S>(w: &mut W, name: &str, values: I) -> io::Result<()>
where
    W: Write,
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    writeln!(w, "{name}:")?;
    for value in values {
        writeln!(w, "\t{}", value.as_ref())?;
    }
    writeln!(w, "end")
}

fn read_sections<R: BufRead>(r: R) -> Result<Vec<(String, Vec<String>)>, GeneFileError> {
    let mut sections = Vec::new();
    let mut open: Option<(String, Vec<String>)> = None;

    for (index, line) in r.lines().enumerate() {
        let line = line?;
        let text = line.trim();

        if text == "end" && open.is_some() {
            sections.extend(open.take());
            continue;
        }
        if let Some((_, values)) = open.as_mut() {
            if !text.is_empty() {
                values.push(text.to_string());
            }
            continue;
        }
        if text.is_empty() {
            continue;
        }
        match text.strip_suffix(':') {
            Some(name) => open = Some((name.to_string(), Vec::new())),
            None => {
                return Err(GeneFileError::UnexpectedLine {
                    line: index + 1,
                    text: text.to_string(),
                });
            }
        }
    }

    match open {
        Some((name, _)) => Err(GeneFileError::Unterminated(name)),
        None => Ok(sections),
    }
}

fn parse<T: std::str::FromStr>(section: &'static str, value: &str) -> Result<T, GeneFileError> {
    value.parse().map_err(|_| GeneFileError::Parse {
        section,
        value: value.to_string(),
    })
}

fn parse_pair(section: &'static str, values: &[String]) -> Result<(usize, usize), GeneFileError> {
    let joined = values.join(" ");
    let mut parts = joined.split_whitespace();
    match (parts.next(), parts.next(), parts.next()) {
        (Some(a), Some(b), None) => Ok((parse(section, a)?, parse(section, b)?)),
        _ => Err(GeneFileError::Parse {
            section,
            value: joined,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn sample() -> GeneFile {
        let individual =
            Individual::from_genes(GeneShape::new(2, 4), vec![0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7, 0.8])
                .unwrap();
        GeneFile {
            target_dims: Some((64, 48)),
            scale: Some(0.05),
            stamp_paths: vec!["stamps/a.png".into(), "stamps/b.png".into()],
            ..GeneFile::new(&individual)
        }
    }

    #[test]
    fn test_written_layout() {
        let mut buf = Vec::new();
        sample().write_to(&mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();

        assert!(text.starts_with("dna_dims:\n\t2 4\nend\n"));
        assert!(text.contains("target_img_dims:\n\t64 48\nend\n"));
        assert!(text.contains("objs_path:\n\tstamps/a.png\n\tstamps/b.png\nend\n"));
        assert!(text.ends_with("\t0.8\nend\n"));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out_genes.txt");

        let original = sample();
        original.save(&path).unwrap();
        let loaded = GeneFile::load(&path).unwrap();

        assert_eq!(loaded, original);
        assert_eq!(loaded.individual().unwrap().get(1, 2), 0.7);
    }

    #[test]
    fn test_optional_sections() {
        let text = "dna_dims:\n\t1 2\nend\n\ngenes:\n\t0.5\n\t0.25\nend\n";
        let file = GeneFile::read_from(Cursor::new(text)).unwrap();
        assert_eq!(file.shape, GeneShape::new(1, 2));
        assert_eq!(file.target_dims, None);
        assert_eq!(file.scale, None);
        assert!(file.stamp_paths.is_empty());
        assert_eq!(file.genes, vec![0.5, 0.25]);
    }

    #[test]
    fn test_gene_count_checked() {
        let text = "dna_dims:\n\t2 2\nend\ngenes:\n\t0.5\nend\n";
        assert!(matches!(
            GeneFile::read_from(Cursor::new(text)),
            Err(GeneFileError::GeneCount {
                expected: 4,
                actual: 1
            })
        ));
    }

    #[test]
    fn test_malformed_input() {
        let missing = "genes:\n\t0.5\nend\n";
        assert!(matches!(
            GeneFile::read_from(Cursor::new(missing)),
            Err(GeneFileError::MissingSection("dna_dims"))
        ));

        let unterminated = "dna_dims:\n\t1 1\n";
        assert!(matches!(
            GeneFile::read_from(Cursor::new(unterminated)),
            Err(GeneFileError::Unterminated(name)) if name == "dna_dims"
        ));

        let stray = "hello\n";
        assert!(matches!(
            GeneFile::read_from(Cursor::new(stray)),
            Err(GeneFileError::UnexpectedLine { line: 1, .. })
        ));

        let empty_shape = "dna_dims:\n\t0 4\nend\ngenes:\nend\n";
        assert!(matches!(
            GeneFile::read_from(Cursor::new(empty_shape)),
            Err(GeneFileError::Parse { section: "dna_dims", .. })
        ));

        let bad_value = "dna_dims:\n\t1 1\nend\ngenes:\n\tabc\nend\n";
        assert!(matches!(
            GeneFile::read_from(Cursor::new(bad_value)),
            Err(GeneFileError::Parse { section: "genes", .. })
        ));
    }
}
