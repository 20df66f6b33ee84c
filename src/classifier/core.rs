use crate::classifier::config::{ImportanceMethod, MissingTreatment, TreeConfig};
use crate::data::{column_modes, impute, take_rows, CategoricalDataset, Matrix};
use crate::errors::DecisionTreeError;
use crate::prune::{HoldoutAccuracy, PruneReport};
use crate::sampler::{RandomSampler, Sampler};
use crate::splitter::GainRatioSplitter;
use crate::tree::Tree;
use crate::utils::is_missing;
use hashbrown::HashMap;
use log::{info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;

type ImportanceFn = fn(&Tree, &mut HashMap<usize, (f64, usize)>);

/// Decision tree classifier: grows a gain ratio tree on categorical
/// features, then optionally prunes it against held out rows.
#[derive(Clone, Debug, Default)]
pub struct DecisionTreeClassifier {
    pub cfg: TreeConfig,
    tree: Option<Tree>,
    fill_values: Option<Vec<f64>>,
    prune_report: Option<PruneReport>,
}

impl DecisionTreeClassifier {
    /// Decision tree classifier object
    ///
    /// * `cfg` - Configuration, checked before the classifier is returned.
    pub fn new(cfg: TreeConfig) -> Result<Self, DecisionTreeError> {
        cfg.validate()?;
        Ok(DecisionTreeClassifier {
            cfg,
            ..Default::default()
        })
    }

    /// The fitted tree, if any.
    pub fn tree(&self) -> Option<&Tree> {
        self.tree.as_ref()
    }

    /// Outcome of the last pruning pass, `None` if the last fit did not prune.
    pub fn prune_report(&self) -> Option<&PruneReport> {
        self.prune_report.as_ref()
    }

    /// Fit the classifier on a provided dataset.
    ///
    /// When pruning is enabled a seeded share of the rows, `validation_fraction`,
    /// is held out, the tree is grown on the remaining rows and pruned against
    /// the held out ones.
    ///
    /// * `data` - Feature codes, one column per feature.
    /// * `y` - Class of every row, as non-negative integers.
    pub fn fit(&mut self, data: &Matrix<f64>, y: &[f64]) -> Result<(), DecisionTreeError> {
        self.cfg.validate()?;
        check_shape(data, y)?;

        if !self.cfg.prune || self.cfg.validation_fraction == 0.0 {
            self.tree = Some(self.fit_tree(data, y)?);
            self.prune_report = None;
            return Ok(());
        }

        let mut rng = StdRng::seed_from_u64(self.cfg.seed);
        let mut sampler = RandomSampler::new(1.0 - self.cfg.validation_fraction);
        let (train_index, valid_index) = sampler.sample(&mut rng, &data.index);
        if train_index.is_empty() || valid_index.is_empty() {
            warn!(
                "Holdout split left {} training and {} validation rows, fitting on all rows without pruning.",
                train_index.len(),
                valid_index.len()
            );
            self.tree = Some(self.fit_tree(data, y)?);
            self.prune_report = None;
            return Ok(());
        }
        info!(
            "Holding out {} of {} rows for pruning.",
            valid_index.len(),
            data.rows
        );

        let train_values = take_rows(data, &train_index);
        let train_y: Vec<f64> = train_index.iter().map(|i| y[*i]).collect();
        let train_data = Matrix::new(&train_values, train_index.len(), data.cols);
        let valid_values = take_rows(data, &valid_index);
        let valid_y: Vec<f64> = valid_index.iter().map(|i| y[*i]).collect();
        let valid_data = Matrix::new(&valid_values, valid_index.len(), data.cols);

        self.fit_with_validation(&train_data, &train_y, &valid_data, &valid_y)
    }

    /// Fit the classifier on `data`, pruning against an explicit validation set
    /// when pruning is enabled.
    ///
    /// * `data` - Training feature codes.
    /// * `y` - Training classes.
    /// * `valid_data` - Validation feature codes, with the columns of `data`.
    /// * `valid_y` - Validation classes.
    pub fn fit_with_validation(
        &mut self,
        data: &Matrix<f64>,
        y: &[f64],
        valid_data: &Matrix<f64>,
        valid_y: &[f64],
    ) -> Result<(), DecisionTreeError> {
        self.cfg.validate()?;
        check_shape(data, y)?;
        if valid_data.rows != valid_y.len() {
            return Err(DecisionTreeError::InputShape(valid_data.rows, valid_y.len()));
        }
        if valid_data.cols != data.cols {
            return Err(DecisionTreeError::FeatureCount(data.cols, valid_data.cols));
        }

        let mut tree = self.fit_tree(data, y)?;
        self.prune_report = if self.cfg.prune {
            let filled = self.filled(valid_data);
            let valid_matrix = filled.as_ref().map(|v| Matrix::new(v, valid_data.rows, valid_data.cols));
            let oracle = HoldoutAccuracy::new(
                valid_matrix.as_ref().unwrap_or(valid_data),
                valid_y,
                self.cfg.missing,
                self.cfg.prune_metric,
            );
            Some(tree.prune(&oracle))
        } else {
            None
        };
        self.tree = Some(tree);
        Ok(())
    }

    fn fit_tree(&mut self, data: &Matrix<f64>, y: &[f64]) -> Result<Tree, DecisionTreeError> {
        let splitter = GainRatioSplitter::new();
        match self.cfg.missing_treatment {
            MissingTreatment::Exclude => {
                self.fill_values = None;
                let dataset = CategoricalDataset::new(data, y, self.cfg.missing)?;
                Tree::fit(&dataset, &splitter, self.cfg.max_depth)
            }
            MissingTreatment::ImputeMode => {
                let fill = column_modes(data, self.cfg.missing);
                let values = impute(data, &fill, self.cfg.missing);
                let imputed = Matrix::new(&values, data.rows, data.cols);
                let dataset = CategoricalDataset::new(&imputed, y, self.cfg.missing)?;
                let tree = Tree::fit(&dataset, &splitter, self.cfg.max_depth)?;
                self.fill_values = Some(fill);
                Ok(tree)
            }
        }
    }

    /// Imputed copy of `data` when the classifier replaces missing values.
    fn filled(&self, data: &Matrix<f64>) -> Option<Vec<f64>> {
        self.fill_values
            .as_ref()
            .map(|fill| impute(data, fill, self.cfg.missing))
    }

    fn fitted_tree(&self, n_cols: usize) -> Result<&Tree, DecisionTreeError> {
        let tree = self.tree.as_ref().ok_or(DecisionTreeError::NotFitted)?;
        if tree.n_features != n_cols {
            return Err(DecisionTreeError::FeatureCount(tree.n_features, n_cols));
        }
        Ok(tree)
    }

    fn run_parallel<T, F>(&self, op: F) -> Result<T, DecisionTreeError>
    where
        T: Send,
        F: FnOnce() -> T + Send,
    {
        match self.cfg.num_threads {
            None => Ok(op()),
            Some(num_threads) => {
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(num_threads)
                    .build()
                    .map_err(|e| {
                        DecisionTreeError::InvalidParameter(
                            "num_threads".to_string(),
                            "a buildable thread pool".to_string(),
                            e.to_string(),
                        )
                    })?;
                Ok(pool.install(op))
            }
        }
    }

    /// Predict the class of every row of `data`, in parallel.
    ///
    /// * `data` - Feature codes, with the columns the classifier was fitted on.
    pub fn predict(&self, data: &Matrix<f64>) -> Result<Vec<f64>, DecisionTreeError> {
        let tree = self.fitted_tree(data.cols)?;
        let filled = self.filled(data);
        let imputed = filled.as_ref().map(|v| Matrix::new(v, data.rows, data.cols));
        let data = imputed.as_ref().unwrap_or(data);
        let missing = self.cfg.missing;
        self.run_parallel(|| tree.predict(data, true, &missing))
    }

    /// Class probabilities of every row of `data`, one vector per row
    /// holding the share of each class at the node the row stops at.
    pub fn predict_proba(&self, data: &Matrix<f64>) -> Result<Vec<Vec<f64>>, DecisionTreeError> {
        let tree = self.fitted_tree(data.cols)?;
        let filled = self.filled(data);
        let imputed = filled.as_ref().map(|v| Matrix::new(v, data.rows, data.cols));
        let data = imputed.as_ref().unwrap_or(data);
        let missing = self.cfg.missing;
        self.run_parallel(|| tree.predict_proba(data, true, &missing))
    }

    /// Predict the class of a single row.
    pub fn predict_row(&self, row: &[f64]) -> Result<f64, DecisionTreeError> {
        let tree = self.fitted_tree(row.len())?;
        let label = match &self.fill_values {
            Some(fill) => {
                let row: Vec<f64> = row
                    .iter()
                    .zip(fill)
                    .map(|(v, f)| if is_missing(v, &self.cfg.missing) { *f } else { *v })
                    .collect();
                tree.predict_row(&row, &self.cfg.missing)
            }
            None => tree.predict_row(row, &self.cfg.missing),
        };
        Ok(label as f64)
    }

    /// Calculate feature importance measure for the features
    /// in the model.
    /// - `method`: variable importance method to use.
    /// - `normalize`: whether to normalize the importance values with the sum.
    pub fn calculate_feature_importance(
        &self,
        method: ImportanceMethod,
        normalize: bool,
    ) -> Result<HashMap<usize, f64>, DecisionTreeError> {
        let tree = self.tree.as_ref().ok_or(DecisionTreeError::NotFitted)?;
        let (average, importance_fn): (bool, ImportanceFn) = match method {
            ImportanceMethod::Weight => (false, Tree::calculate_importance_weight),
            ImportanceMethod::Gain => (true, Tree::calculate_importance_gain),
            ImportanceMethod::TotalGain => (false, Tree::calculate_importance_gain),
        };
        let mut stats = HashMap::new();
        importance_fn(tree, &mut stats);

        let importance = stats
            .iter()
            .map(|(k, (v, c))| if average { (*k, v / (*c as f64)) } else { (*k, *v) })
            .collect::<HashMap<usize, f64>>();

        if normalize {
            // Sum in sorted order so the total does not depend on map order.
            let mut values: Vec<f64> = importance.values().copied().collect();
            values.sort_by(|a, b| a.total_cmp(b));
            let total: f64 = values.iter().sum();
            if total == 0.0 {
                return Ok(importance);
            }
            Ok(importance.iter().map(|(k, v)| (*k, v / total)).collect())
        } else {
            Ok(importance)
        }
    }
}

fn check_shape(data: &Matrix<f64>, y: &[f64]) -> Result<(), DecisionTreeError> {
    if data.rows != y.len() {
        return Err(DecisionTreeError::InputShape(data.rows, y.len()));
    }
    if data.rows == 0 {
        return Err(DecisionTreeError::EmptyData);
    }
    Ok(())
}
