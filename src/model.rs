use anyhow::{bail, Context, Result};
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

/// Predicted lap times strictly below this call for a stop.
pub const PIT_THRESHOLD_S: f64 = 72.12;

pub const FEATURES: [&str; 2] = ["race_position", "track_length"];

// Centred sums of squares at or below this are treated as zero variance.
const EPS: f64 = 1e-12;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrainingRecord {
    pub lap_time_s: f64,
    pub race_position: u32,
    pub track_length_m: f64,
}

pub fn training_set() -> Vec<TrainingRecord> {
    [(85.0, 1), (90.0, 2), (78.0, 3), (92.0, 4), (84.0, 5), (87.0, 6)]
        .into_iter()
        .map(|(lap_time_s, race_position)| TrainingRecord {
            lap_time_s,
            race_position,
            track_length_m: 5000.0,
        })
        .collect()
}

/// Fitted (race_position, track_length) -> lap time regression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearModel {
    pub features: Vec<String>,
    pub coefficients: [f64; 2],
    pub intercept: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PitDecision {
    #[serde(rename = "Pit")]
    Pit,
    #[serde(rename = "No Pit")]
    NoPit,
}

impl PitDecision {
    pub fn from_lap_time(predicted_lap_time_s: f64) -> Self {
        if predicted_lap_time_s < PIT_THRESHOLD_S {
            PitDecision::Pit
        } else {
            PitDecision::NoPit
        }
    }
}

impl LinearModel {
    /// Fits the model on the fixed six-row dataset.
    pub fn train() -> Result<Self> {
        let records = training_set();
        let x = Array2::from_shape_vec(
            (records.len(), FEATURES.len()),
            records
                .iter()
                .flat_map(|r| [r.race_position as f64, r.track_length_m])
                .collect(),
        )?;
        let y = Array1::from_iter(records.iter().map(|r| r.lap_time_s));
        Self::fit(&x, &y)
    }

    /// Ordinary least squares with an intercept, solved on mean-centred data.
    ///
    /// A column with no variance gets a zero coefficient, the minimum-norm
    /// solution, so a constant feature is absorbed by the intercept instead of
    /// making the system singular.
    pub fn fit(x: &Array2<f64>, y: &Array1<f64>) -> Result<Self> {
        let (n, p) = x.dim();
        if p != FEATURES.len() {
            bail!("expected {} feature columns, got {}", FEATURES.len(), p);
        }
        if n != y.len() {
            bail!("row count mismatch: {} feature rows, {} targets", n, y.len());
        }
        if n < 2 {
            bail!("need at least two training rows, got {}", n);
        }

        let x_mean = x.mean_axis(Axis(0)).context("empty feature matrix")?;
        let y_mean = y.mean().context("empty target vector")?;
        let xc = x - &x_mean;
        let yc = y - y_mean;

        let active: Vec<usize> = (0..p)
            .filter(|&j| xc.column(j).dot(&xc.column(j)) > EPS)
            .collect();

        let k = active.len();
        let mut gram = Array2::<f64>::zeros((k, k));
        let mut rhs = Array1::<f64>::zeros(k);
        for (a, &ja) in active.iter().enumerate() {
            rhs[a] = xc.column(ja).dot(&yc);
            for (b, &jb) in active.iter().enumerate() {
                gram[[a, b]] = xc.column(ja).dot(&xc.column(jb));
            }
        }
        let solved = solve(gram, rhs)?;

        let mut coefficients = [0.0; 2];
        for (a, &j) in active.iter().enumerate() {
            coefficients[j] = solved[a];
        }
        let intercept = y_mean - x_mean.dot(&Array1::from_vec(coefficients.to_vec()));

        Ok(Self {
            features: FEATURES.iter().map(|s| s.to_string()).collect(),
            coefficients,
            intercept,
        })
    }

    pub fn predict(&self, race_position: f64, track_length_m: f64) -> f64 {
        self.intercept
            + self.coefficients[0] * race_position
            + self.coefficients[1] * track_length_m
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)
                .with_context(|| format!("failed to create {}", dir.display()))?;
        }
        let txt = serde_json::to_string_pretty(self)?;
        fs::write(path, txt)
            .with_context(|| format!("failed to write model artifact {}", path.display()))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let txt = fs::read_to_string(path)
            .with_context(|| format!("failed to read model artifact {}", path.display()))?;
        let model: Self = serde_json::from_str(&txt)
            .with_context(|| format!("failed to parse model artifact {}", path.display()))?;
        if model.features != FEATURES {
            bail!("model artifact has unexpected features {:?}", model.features);
        }
        Ok(model)
    }
}

// Gaussian elimination with partial pivoting; the systems here are at most 2x2.
// linfa-linear's Cholesky solve rejects the constant track_length column, so no swap.
fn solve(mut a: Array2<f64>, mut b: Array1<f64>) -> Result<Array1<f64>> {
    let n = b.len();
    for col in 0..n {
        let pivot = (col..n)
            .max_by(|&i, &j| a[[i, col]].abs().total_cmp(&a[[j, col]].abs()))
            .unwrap_or(col);
        if a[[pivot, col]].abs() <= EPS {
            bail!("training features are collinear");
        }
        if pivot != col {
            for c in 0..n {
                a.swap([col, c], [pivot, c]);
            }
            b.swap(col, pivot);
        }
        for row in col + 1..n {
            let f = a[[row, col]] / a[[col, col]];
            for c in col..n {
                a[[row, c]] -= f * a[[col, c]];
            }
            b[row] -= f * b[col];
        }
    }

    let mut x = Array1::<f64>::zeros(n);
    for row in (0..n).rev() {
        let tail: f64 = (row + 1..n).map(|c| a[[row, c]] * x[c]).sum();
        x[row] = (b[row] - tail) / a[[row, row]];
    }
    Ok(x)
}
