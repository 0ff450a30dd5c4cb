//! Weighted query mix.
use graphbench_core::{ConfigError, QueryTemplate, WEIGHT_SUM_TOLERANCE};
use rand::Rng;

/// The fixed set of query templates for a run together with their cumulative distribution.
#[derive(Clone, Debug)]
pub struct Workload {
    templates: Vec<QueryTemplate>,
    cdf: Vec<f64>,
}

impl Workload {
    /// Builds the cumulative distribution for `templates`.
    ///
    /// Either every template carries a weight, or none do and there is exactly one template.
    /// Weights must add up to 1.0 within [`WEIGHT_SUM_TOLERANCE`].
    pub fn new(templates: Vec<QueryTemplate>) -> Result<Self, ConfigError> {
        if templates.is_empty() {
            return Err(ConfigError::NoQueries);
        }

        let weights: Vec<f64> = templates.iter().filter_map(|t| t.weight).collect();
        let weights = if weights.is_empty() {
            if templates.len() > 1 {
                return Err(ConfigError::MissingWeights {
                    queries: templates.len(),
                });
            }
            vec![1.]
        } else if weights.len() != templates.len() {
            return Err(ConfigError::WeightCountMismatch {
                queries: templates.len(),
                weights: weights.len(),
            });
        } else {
            weights
        };

        Self::with_weights(templates, &weights)
    }

    /// Like [`Workload::new`], but with weights supplied separately from the templates. Any
    /// weights already on the templates are replaced.
    pub fn from_parts(
        templates: Vec<QueryTemplate>,
        weights: &[f64],
    ) -> Result<Self, ConfigError> {
        if templates.is_empty() {
            return Err(ConfigError::NoQueries);
        }

        if weights.is_empty() && templates.len() == 1 {
            return Self::with_weights(templates, &[1.]);
        }

        if weights.is_empty() {
            return Err(ConfigError::MissingWeights {
                queries: templates.len(),
            });
        }

        if weights.len() != templates.len() {
            return Err(ConfigError::WeightCountMismatch {
                queries: templates.len(),
                weights: weights.len(),
            });
        }

        Self::with_weights(templates, weights)
    }

    fn with_weights(mut templates: Vec<QueryTemplate>, weights: &[f64]) -> Result<Self, ConfigError> {
        if let Some((index, weight)) = weights
            .iter()
            .enumerate()
            .find(|(_, w)| !w.is_finite() || **w < 0.)
        {
            return Err(ConfigError::InvalidWeight {
                index,
                weight: *weight,
            });
        }

        let total: f64 = weights.iter().sum();
        if (1. - total).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(ConfigError::WeightSum(total));
        }

        let cdf = weights
            .iter()
            .scan(0., |acc, w| {
                *acc += w;
                Some(*acc)
            })
            .collect();

        for (template, weight) in templates.iter_mut().zip(weights) {
            template.weight = Some(*weight);
        }

        Ok(Self { templates, cdf })
    }

    /// Draws one query index according to the configured weights.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> usize {
        self.sample_at(rng.gen::<f64>())
    }

    /// Smallest index whose cumulative weight is at least `r`.
    ///
    /// Clamps to the last query if floating point drift leaves `r` above the final bucket.
    pub fn sample_at(&self, r: f64) -> usize {
        let bucket = self.cdf.partition_point(|c| r > *c);
        bucket.min(self.cdf.len() - 1)
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&QueryTemplate> {
        self.templates.get(index)
    }

    pub fn templates(&self) -> &[QueryTemplate] {
        &self.templates
    }

    pub fn cdf(&self) -> &[f64] {
        &self.cdf
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    fn workload(weights: &[f64]) -> Workload {
        let templates = (0..weights.len())
            .map(|i| QueryTemplate::new(format!("RETURN {i}")))
            .collect();
        Workload::from_parts(templates, weights).unwrap()
    }

    #[test]
    fn cdf_is_monotonic() {
        let w = workload(&[0.2, 0.0, 0.5, 0.3]);
        let cdf = w.cdf();
        assert!(cdf.windows(2).all(|pair| pair[1] >= pair[0]));
        assert!((cdf[cdf.len() - 1] - 1.).abs() < 1e-9);
    }

    #[test]
    fn sample_at_boundaries() {
        let w = workload(&[0.01, 0.99]);
        assert_eq!(w.sample_at(0.), 0);
        assert_eq!(w.sample_at(0.01), 0);
        assert_eq!(w.sample_at(0.5), 1);
        assert_eq!(w.sample_at(0.999), 1);
    }

    #[test]
    fn sample_clamps_on_drift() {
        // Sums to 0.995, inside tolerance, so a draw above it must clamp to the last index.
        let w = workload(&[0.5, 0.495]);
        assert_eq!(w.sample_at(0.9999), 1);
        assert_eq!(w.sample_at(2.), 1);
    }

    #[test]
    fn single_query_always_zero() {
        let w = Workload::new(vec![QueryTemplate::new("CREATE (n)")]).unwrap();
        assert_eq!(w.cdf(), &[1.]);

        let mut rng = SmallRng::seed_from_u64(7);
        for _ in 0..1_000 {
            assert_eq!(w.sample(&mut rng), 0);
        }
        assert_eq!(w.sample_at(0.), 0);
        assert_eq!(w.sample_at(1.5), 0);
    }

    #[test]
    fn frequencies_converge_to_weights() {
        let weights = [0.1, 0.6, 0.3];
        let w = workload(&weights);
        let mut rng = SmallRng::seed_from_u64(12345);
        let mut counts = [0u64; 3];

        let draws = 200_000;
        for _ in 0..draws {
            let idx = w.sample(&mut rng);
            assert!(idx < 3);
            counts[idx] += 1;
        }

        for (count, weight) in counts.iter().zip(weights) {
            let freq = *count as f64 / draws as f64;
            assert!((freq - weight).abs() < 0.01, "freq {freq} vs weight {weight}");
        }
    }

    #[test]
    fn weights_must_sum_to_one() {
        let templates = vec![QueryTemplate::new("a"), QueryTemplate::new("b")];
        let err = Workload::from_parts(templates, &[0.5, 0.6]).unwrap_err();
        assert!(matches!(err, ConfigError::WeightSum(_)));
    }

    #[test]
    fn weights_within_tolerance_are_accepted() {
        let templates = vec![QueryTemplate::new("a"), QueryTemplate::new("b")];
        assert!(Workload::from_parts(templates, &[0.5, 0.509]).is_ok());
    }

    #[test]
    fn weight_count_mismatch() {
        let templates = vec![
            QueryTemplate::new("a").weight(0.5),
            QueryTemplate::new("b"),
        ];
        assert_eq!(
            Workload::new(templates).unwrap_err(),
            ConfigError::WeightCountMismatch {
                queries: 2,
                weights: 1
            }
        );

        let templates = vec![QueryTemplate::new("a")];
        assert_eq!(
            Workload::from_parts(templates, &[0.5, 0.5]).unwrap_err(),
            ConfigError::WeightCountMismatch {
                queries: 1,
                weights: 2
            }
        );
    }

    #[test]
    fn missing_weights() {
        let templates = vec![QueryTemplate::new("a"), QueryTemplate::new("b")];
        assert_eq!(
            Workload::new(templates).unwrap_err(),
            ConfigError::MissingWeights { queries: 2 }
        );
    }

    #[test]
    fn no_queries() {
        assert_eq!(Workload::new(vec![]).unwrap_err(), ConfigError::NoQueries);
    }

    #[test]
    fn negative_weight_rejected() {
        let templates = vec![QueryTemplate::new("a"), QueryTemplate::new("b")];
        assert!(matches!(
            Workload::from_parts(templates, &[1.5, -0.5]).unwrap_err(),
            ConfigError::InvalidWeight { index: 1, .. }
        ));
    }
}
