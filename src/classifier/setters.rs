use crate::classifier::config::MissingTreatment;
use crate::metric::Metric;
use crate::DecisionTreeClassifier;

impl DecisionTreeClassifier {
    // Set methods for paramters

    /// Set the missing value on the classifier.
    /// * `missing` - Value to consider missing.
    pub fn set_missing(mut self, missing: f64) -> Self {
        self.cfg.missing = missing;
        self
    }

    /// Set the missing value treatment on the classifier.
    /// * `missing_treatment` - Exclude missing values from split counts, or impute them.
    pub fn set_missing_treatment(mut self, missing_treatment: MissingTreatment) -> Self {
        self.cfg.missing_treatment = missing_treatment;
        self
    }

    /// Set whether the tree is pruned after it is grown.
    /// * `prune` - Apply reduced error pruning.
    pub fn set_prune(mut self, prune: bool) -> Self {
        self.cfg.prune = prune;
        self
    }

    /// Set the share of training rows held out for pruning.
    /// * `validation_fraction` - Value in `[0, 1)`, zero disables the holdout.
    pub fn set_validation_fraction(mut self, validation_fraction: f32) -> Self {
        self.cfg.validation_fraction = validation_fraction;
        self
    }

    /// Set the metric compared while pruning.
    pub fn set_prune_metric(mut self, prune_metric: Metric) -> Self {
        self.cfg.prune_metric = prune_metric;
        self
    }

    /// Set the seed of the holdout sampler.
    pub fn set_seed(mut self, seed: u64) -> Self {
        self.cfg.seed = seed;
        self
    }

    /// Set the depth limit of the tree.
    pub fn set_max_depth(mut self, max_depth: Option<usize>) -> Self {
        self.cfg.max_depth = max_depth;
        self
    }

    /// Set the number of threads used for prediction.
    pub fn set_num_threads(mut self, num_threads: Option<usize>) -> Self {
        self.cfg.num_threads = num_threads;
        self
    }
}
