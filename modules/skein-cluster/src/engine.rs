use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use skein_common::{EmbeddingRecord, SkeinError};

/// Cluster count policy: one cluster per six records, at least three.
pub fn cluster_count(n: usize) -> usize {
    (n / 6).max(3)
}

/// Hard-assigns every vector a cluster id in `[0, k)`.
///
/// Strategies are pluggable; the historical corpus ran several (fixed k,
/// density based, mixture models). The default is [`GaussianMixture`].
pub trait ClusterStrategy {
    fn fit(&self, vectors: &[Vec<f32>], k: usize) -> Result<Vec<usize>, SkeinError>;
}

const VAR_FLOOR: f64 = 1e-6;

/// Spherical-covariance Gaussian mixture fitted by EM, k-means++ seeding,
/// seeded RNG so runs are reproducible.
#[derive(Debug, Clone)]
pub struct GaussianMixture {
    pub max_iters: usize,
    pub tol: f64,
    pub seed: u64,
}

impl Default for GaussianMixture {
    fn default() -> Self {
        Self {
            max_iters: 100,
            tol: 1e-4,
            seed: 42,
        }
    }
}

impl ClusterStrategy for GaussianMixture {
    fn fit(&self, vectors: &[Vec<f32>], k: usize) -> Result<Vec<usize>, SkeinError> {
        let data = to_f64(vectors)?;
        let n = data.len();
        let k = effective_k(k, n)?;
        let d = data[0].len() as f64;
        let mut rng = StdRng::seed_from_u64(self.seed);

        let mut means = kmeanspp_init(&data, k, &mut rng);
        let init_var = initial_variance(&data, &means, d);
        let mut vars = vec![init_var; k];
        let mut weights = vec![1.0 / k as f64; k];

        let mut resp = vec![vec![0.0f64; k]; n];
        let mut prev_ll = f64::NEG_INFINITY;

        for iter in 0..self.max_iters {
            // E step: responsibilities via log-sum-exp.
            let mut ll = 0.0;
            for (i, point) in data.iter().enumerate() {
                let mut log_p = vec![0.0f64; k];
                for j in 0..k {
                    log_p[j] = weights[j].max(1e-300).ln()
                        - 0.5 * d * (2.0 * std::f64::consts::PI * vars[j]).ln()
                        - 0.5 * sq_dist(point, &means[j]) / vars[j];
                }
                let lse = log_sum_exp(&log_p);
                for j in 0..k {
                    resp[i][j] = (log_p[j] - lse).exp();
                }
                ll += lse;
            }

            // M step.
            for j in 0..k {
                let nj: f64 = resp.iter().map(|r| r[j]).sum();
                if nj < 1e-9 {
                    // Dead component: reseed on a random point.
                    let idx = rng.random_range(0..n);
                    means[j] = data[idx].clone();
                    vars[j] = init_var;
                    weights[j] = 1.0 / n as f64;
                    continue;
                }
                weights[j] = nj / n as f64;

                let dims = means[j].len();
                let mut mean = vec![0.0f64; dims];
                for (point, r) in data.iter().zip(&resp) {
                    for (m, x) in mean.iter_mut().zip(point) {
                        *m += r[j] * x;
                    }
                }
                for m in &mut mean {
                    *m /= nj;
                }

                let var: f64 = data
                    .iter()
                    .zip(&resp)
                    .map(|(point, r)| r[j] * sq_dist(point, &mean))
                    .sum::<f64>()
                    / (nj * d);

                means[j] = mean;
                vars[j] = var.max(VAR_FLOOR);
            }

            let delta = (ll - prev_ll).abs();
            debug!(iter, ll, delta, "EM iteration");
            if delta < self.tol * ll.abs().max(1.0) {
                break;
            }
            prev_ll = ll;
        }

        // Hard assignment: highest-responsibility component.
        Ok(resp.iter().map(|r| argmax(r)).collect())
    }
}

/// Lloyd's k-means with k-means++ seeding. Alternate strategy, same trait.
#[derive(Debug, Clone)]
pub struct KMeans {
    pub max_iters: usize,
    pub seed: u64,
}

impl Default for KMeans {
    fn default() -> Self {
        Self {
            max_iters: 100,
            seed: 42,
        }
    }
}

impl ClusterStrategy for KMeans {
    fn fit(&self, vectors: &[Vec<f32>], k: usize) -> Result<Vec<usize>, SkeinError> {
        let data = to_f64(vectors)?;
        let n = data.len();
        let k = effective_k(k, n)?;
        let mut rng = StdRng::seed_from_u64(self.seed);

        let mut centers = kmeanspp_init(&data, k, &mut rng);
        let mut assignments = vec![0usize; n];

        for _ in 0..self.max_iters {
            let mut changed = false;
            for (i, point) in data.iter().enumerate() {
                let nearest = nearest_center(point, &centers);
                if assignments[i] != nearest {
                    assignments[i] = nearest;
                    changed = true;
                }
            }

            for j in 0..k {
                let members: Vec<&Vec<f64>> = data
                    .iter()
                    .zip(&assignments)
                    .filter(|(_, &a)| a == j)
                    .map(|(p, _)| p)
                    .collect();
                if members.is_empty() {
                    // Reseed an empty cluster on the point farthest from its
                    // currently assigned center.
                    let mut farthest = 0;
                    let mut farthest_dist = -1.0;
                    for (i, point) in data.iter().enumerate() {
                        let dist = sq_dist(point, &centers[assignments[i]]);
                        if dist > farthest_dist {
                            farthest = i;
                            farthest_dist = dist;
                        }
                    }
                    centers[j] = data[farthest].clone();
                    changed = true;
                    continue;
                }
                let dims = centers[j].len();
                let mut mean = vec![0.0f64; dims];
                for point in &members {
                    for (m, x) in mean.iter_mut().zip(point.iter()) {
                        *m += x;
                    }
                }
                for m in &mut mean {
                    *m /= members.len() as f64;
                }
                centers[j] = mean;
            }

            if !changed {
                break;
            }
        }

        Ok(assignments)
    }
}

/// Cluster members in encounter order, ready for theme labeling. Empty
/// clusters are dropped; ids stay ascending.
#[derive(Debug, Clone)]
pub struct ClusterGroup {
    pub id: usize,
    pub links: Vec<String>,
    pub titles: Vec<String>,
    pub combined: Vec<String>,
}

pub fn group_records(
    records: &[EmbeddingRecord],
    assignments: &[usize],
    k: usize,
) -> Vec<ClusterGroup> {
    let mut groups: Vec<ClusterGroup> = (0..k)
        .map(|id| ClusterGroup {
            id,
            links: Vec::new(),
            titles: Vec::new(),
            combined: Vec::new(),
        })
        .collect();

    for (record, &cluster) in records.iter().zip(assignments) {
        groups[cluster].links.push(record.link.clone());
        groups[cluster].titles.push(record.title.clone());
        groups[cluster].combined.push(record.combined.clone());
    }

    groups.retain(|g| !g.links.is_empty());
    groups
}

// --- shared math helpers ---

fn to_f64(vectors: &[Vec<f32>]) -> Result<Vec<Vec<f64>>, SkeinError> {
    if vectors.is_empty() {
        return Err(SkeinError::DataFormat("nothing to cluster".to_string()));
    }
    Ok(vectors
        .iter()
        .map(|v| v.iter().map(|&x| x as f64).collect())
        .collect())
}

fn effective_k(k: usize, n: usize) -> Result<usize, SkeinError> {
    if k == 0 {
        return Err(SkeinError::DataFormat("cluster count must be > 0".to_string()));
    }
    Ok(k.min(n))
}

fn sq_dist(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

fn nearest_center(point: &[f64], centers: &[Vec<f64>]) -> usize {
    argmin_by(centers, |c| sq_dist(point, c))
}

fn argmax(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, v) in values.iter().enumerate() {
        if *v > values[best] {
            best = i;
        }
    }
    best
}

fn argmin_by<T>(items: &[T], score: impl Fn(&T) -> f64) -> usize {
    let mut best = 0;
    let mut best_score = f64::INFINITY;
    for (i, item) in items.iter().enumerate() {
        let s = score(item);
        if s < best_score {
            best = i;
            best_score = s;
        }
    }
    best
}

fn log_sum_exp(values: &[f64]) -> f64 {
    let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    if max.is_infinite() {
        return max;
    }
    max + values.iter().map(|v| (v - max).exp()).sum::<f64>().ln()
}

/// k-means++ seeding: first center uniform, then proportional to squared
/// distance from the nearest chosen center.
fn kmeanspp_init(data: &[Vec<f64>], k: usize, rng: &mut StdRng) -> Vec<Vec<f64>> {
    let mut centers = Vec::with_capacity(k);
    centers.push(data[rng.random_range(0..data.len())].clone());

    let mut dists: Vec<f64> = data.iter().map(|p| sq_dist(p, &centers[0])).collect();

    while centers.len() < k {
        let total: f64 = dists.iter().sum();
        let idx = if total <= f64::EPSILON {
            rng.random_range(0..data.len())
        } else {
            let mut target = rng.random::<f64>() * total;
            let mut chosen = data.len() - 1;
            for (i, d) in dists.iter().enumerate() {
                target -= d;
                if target <= 0.0 {
                    chosen = i;
                    break;
                }
            }
            chosen
        };
        let center = data[idx].clone();
        for (i, p) in data.iter().enumerate() {
            let d = sq_dist(p, &center);
            if d < dists[i] {
                dists[i] = d;
            }
        }
        centers.push(center);
    }
    centers
}

fn initial_variance(data: &[Vec<f64>], centers: &[Vec<f64>], d: f64) -> f64 {
    let total: f64 = data
        .iter()
        .map(|p| {
            centers
                .iter()
                .map(|c| sq_dist(p, c))
                .fold(f64::INFINITY, f64::min)
        })
        .sum();
    (total / (data.len() as f64 * d)).max(VAR_FLOOR)
}
