//! Writes a small demo portal tree for trying the viewer without real data:
//!
//! ```text
//! <out>/demo-project/de-dataset/metadata.csv
//! <out>/demo-project/de-dataset/process.txt
//! <out>/demo-project/de-dataset/<comparison>/<comparison>.results.csv
//! <out>/demo-project/expression-table/expression.parquet
//! <out>/demo-project/expression-table/process.txt
//! ```
//!
//! Usage: `generate_sample [OUT_DIR]` (defaults to `demo-portal`).

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;

const N_GENES: usize = 500;
const N_DE_GENES: usize = 40;

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }
}

struct Sample {
    id: String,
    condition: &'static str,
    batch: i64,
    timepoint: &'static str,
}

/// A gene with its per-sample counts and the true log2 effect of treatment.
struct Gene {
    id: String,
    name: String,
    effect: f64,
    counts: Vec<i64>,
}

fn samples() -> Vec<Sample> {
    let mut out = Vec::new();
    for (i, condition) in ["ctrl", "ctrl", "ctrl", "ctrl", "treated", "treated", "treated", "treated"]
        .into_iter()
        .enumerate()
    {
        out.push(Sample {
            id: format!("S{}", i + 1),
            condition,
            batch: (i % 2) as i64 + 1,
            timepoint: if i % 4 < 2 { "early" } else { "late" },
        });
    }
    out
}

fn simulate_genes(samples: &[Sample], rng: &mut SimpleRng) -> Vec<Gene> {
    (0..N_GENES)
        .map(|g| {
            // First half of the DE genes go up, second half down.
            let effect = if g < N_DE_GENES / 2 {
                rng.gauss(2.5, 0.5)
            } else if g < N_DE_GENES {
                rng.gauss(-2.5, 0.5)
            } else {
                0.0
            };
            let base = rng.gauss(5.0, 1.5).exp2();
            let counts = samples
                .iter()
                .map(|s| {
                    let shift = if s.condition == "treated" { effect } else { 0.0 };
                    let batch = if s.batch == 2 { 0.2 } else { 0.0 };
                    let mean = base * (shift + batch).exp2();
                    rng.gauss(mean, mean.sqrt()).round().max(0.0) as i64
                })
                .collect();
            Gene {
                id: format!("ENSG{:011}", g + 1),
                name: format!("GENE{}", g + 1),
                effect,
                counts,
            }
        })
        .collect()
}

/// Benjamini-Hochberg adjustment.
fn adjust_fdr(p_values: &[f64]) -> Vec<f64> {
    let n = p_values.len();
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| p_values[b].total_cmp(&p_values[a]));
    let mut fdr = vec![0.0; n];
    let mut running = 1.0_f64;
    for (rank, &i) in order.iter().enumerate() {
        let k = (n - rank) as f64;
        running = running.min(p_values[i] * n as f64 / k);
        fdr[i] = running;
    }
    fdr
}

/// Write `<dir>/<name>/<name>.results.csv` for the samples in `members`.
fn write_comparison(
    dir: &Path,
    name: &str,
    genes: &[Gene],
    samples: &[Sample],
    members: &[usize],
    rng: &mut SimpleRng,
) -> Result<()> {
    let cmp_dir = dir.join(name);
    std::fs::create_dir_all(&cmp_dir)
        .with_context(|| format!("creating {}", cmp_dir.display()))?;

    // Only the treatment comparison carries the planted effect.
    let treatment = name.starts_with("treated");
    let stats: Vec<(f64, f64)> = genes
        .iter()
        .map(|g| {
            let log_fc = if treatment { g.effect } else { 0.0 } + rng.gauss(0.0, 0.3);
            let p_value = if treatment && g.effect != 0.0 {
                10f64.powf(-rng.gauss(6.0, 2.0).max(2.0))
            } else {
                rng.next_f64().max(1e-6)
            };
            (log_fc, p_value)
        })
        .collect();
    let p_values: Vec<f64> = stats.iter().map(|(_, p)| *p).collect();
    let fdr = adjust_fdr(&p_values);

    let path = cmp_dir.join(format!("{name}.results.csv"));
    let mut writer = csv::Writer::from_path(&path)
        .with_context(|| format!("creating {}", path.display()))?;

    let mut header = vec!["GeneID", "GeneName", "logFC", "PValue", "FDR"];
    header.extend(members.iter().map(|&i| samples[i].id.as_str()));
    writer.write_record(&header)?;

    for (g, gene) in genes.iter().enumerate() {
        let (log_fc, p_value) = stats[g];
        let mut record = vec![
            gene.id.clone(),
            gene.name.clone(),
            format!("{log_fc:.4}"),
            format!("{p_value:.4e}"),
            format!("{:.4e}", fdr[g]),
        ];
        record.extend(members.iter().map(|&i| gene.counts[i].to_string()));
        writer.write_record(&record)?;
    }
    writer.flush()?;
    println!("Wrote {}", path.display());
    Ok(())
}

fn write_de_dataset(
    dir: &Path,
    samples: &[Sample],
    genes: &[Gene],
    rng: &mut SimpleRng,
) -> Result<()> {
    std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    std::fs::write(dir.join("process.txt"), "differential-expression-table\n")?;

    let path = dir.join("metadata.csv");
    let mut writer = csv::Writer::from_path(&path)
        .with_context(|| format!("creating {}", path.display()))?;
    writer.write_record(["sample", "condition", "batch", "timepoint"])?;
    for s in samples {
        let batch = s.batch.to_string();
        writer.write_record([s.id.as_str(), s.condition, batch.as_str(), s.timepoint])?;
    }
    writer.flush()?;
    println!("Wrote {}", path.display());

    let all: Vec<usize> = (0..samples.len()).collect();
    write_comparison(dir, "treated_vs_ctrl", genes, samples, &all, rng)?;

    // Second comparison over a subset of samples, overlapping the first.
    let early_late: Vec<usize> = (0..samples.len()).filter(|i| i % 4 != 3).collect();
    write_comparison(dir, "late_vs_early", genes, samples, &early_late, rng)?;
    Ok(())
}

/// A long-format expression table as Parquet, for the plain table view.
fn write_expression_table(dir: &Path, samples: &[Sample], genes: &[Gene]) -> Result<()> {
    std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    std::fs::write(dir.join("process.txt"), "expression-table\n")?;

    let mut gene_ids = Vec::new();
    let mut sample_ids = Vec::new();
    let mut conditions = Vec::new();
    let mut counts = Vec::new();
    let mut log_counts = Vec::new();
    for gene in genes.iter().take(50) {
        for (s, sample) in samples.iter().enumerate() {
            gene_ids.push(gene.id.as_str());
            sample_ids.push(sample.id.as_str());
            conditions.push(sample.condition);
            counts.push(gene.counts[s]);
            log_counts.push((gene.counts[s] as f64 + 1.0).log2());
        }
    }

    let schema = Arc::new(Schema::new(vec![
        Field::new("gene_id", DataType::Utf8, false),
        Field::new("sample", DataType::Utf8, false),
        Field::new("condition", DataType::Utf8, false),
        Field::new("count", DataType::Int64, false),
        Field::new("log2_count", DataType::Float64, false),
    ]));

    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(StringArray::from(gene_ids)),
            Arc::new(StringArray::from(sample_ids)),
            Arc::new(StringArray::from(conditions)),
            Arc::new(Int64Array::from(counts)),
            Arc::new(Float64Array::from(log_counts)),
        ],
    )
    .context("building record batch")?;

    let path = dir.join("expression.parquet");
    let file = std::fs::File::create(&path)
        .with_context(|| format!("creating {}", path.display()))?;
    let mut writer = ArrowWriter::try_new(file, schema, None)?;
    writer.write(&batch)?;
    writer.close()?;
    println!("Wrote {} rows to {}", batch.num_rows(), path.display());
    Ok(())
}

fn main() -> Result<()> {
    let out: PathBuf = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("demo-portal"));
    let project = out.join("demo-project");

    let mut rng = SimpleRng::new(42);
    let samples = samples();
    let genes = simulate_genes(&samples, &mut rng);

    write_de_dataset(&project.join("de-dataset"), &samples, &genes, &mut rng)?;
    write_expression_table(&project.join("expression-table"), &samples, &genes)?;

    println!(
        "Demo portal ready: {} genes x {} samples under {}",
        genes.len(),
        samples.len(),
        out.display()
    );
    Ok(())
}
