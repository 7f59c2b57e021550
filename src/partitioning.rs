//! Train/test partitioning of user interactions.
//!
//! A [`Partitioning`] splits each user's interactions on their own, then
//! aggregates the per-user results by fold index: fold `k` of the output
//! holds fold `k` of every user that could be split.
use std::fmt;

use itertools::Itertools;
use rand;
use rand::prng::XorShiftRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

use data::{Interaction, Ratings, Split};
use progress::Progress;
use UserId;

/// Per-user train folds and test folds, positionally paired.
pub type UserFolds = (Vec<Vec<Interaction>>, Vec<Vec<Interaction>>);

/// Invalid partitioning parameters.
#[derive(Debug, Fail, Clone, PartialEq)]
pub enum ConfigurationError {
    /// The train set size is outside the open `(0, 1)` interval.
    #[fail(display = "The train set size must be a float in the (0, 1) interval, got {}", _0)]
    InvalidTrainSetSize(f64),
    /// K-fold partitioning needs at least two splits.
    #[fail(display = "The number of splits must be at least 2, got {}", _0)]
    InvalidNumSplits(usize),
}

/// A user whose interactions cannot be split with the configured technique.
#[derive(Debug, Fail, Clone, PartialEq)]
pub enum InsufficientDataError {
    /// Fewer interactions than K-fold splits.
    #[fail(
        display = "Cannot have number of splits n_splits={} greater than the number of interactions n_interactions={}",
        n_splits,
        n_interactions
    )]
    TooFewInteractions {
        /// Configured number of splits.
        n_splits: usize,
        /// Number of interactions of the user.
        n_interactions: usize,
    },
    /// The hold-out train set would have no interactions.
    #[fail(
        display = "With n_interactions={} and train_set_size={}, the resulting train set will be empty",
        n_interactions,
        train_set_size
    )]
    EmptyTrainSet {
        /// Number of interactions of the user.
        n_interactions: usize,
        /// Configured train set size.
        train_set_size: f64,
    },
}

/// Splitting failed for a user and the partitioning was not configured
/// to skip such users.
#[derive(Debug, Fail, Clone, PartialEq)]
#[fail(display = "{}\nThe user {} could not be split", cause, user_id)]
pub struct PartitioningError {
    /// The user that could not be split.
    pub user_id: UserId,
    /// Why the split failed.
    #[cause]
    pub cause: InsufficientDataError,
}

/// The splitting technique and its own parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Technique {
    /// K-fold with the given number of splits.
    KFold(usize),
    /// Hold-out with the given train set fraction.
    HoldOut(f64),
}

/// Number of K-fold splits used by [`PartitioningConfig::default`].
pub const DEFAULT_N_SPLITS: usize = 2;

/// Conventional hold-out train set fraction.
pub const DEFAULT_TRAIN_SET_SIZE: f64 = 0.8;

/// Partitioning parameters.
///
/// Validated into a [`Partitioning`] by [`PartitioningConfig::build`].
/// The default is K-fold with [`DEFAULT_N_SPLITS`] splits, shuffled
/// without a fixed seed, skipping users that cannot be split.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PartitioningConfig {
    technique: Technique,
    shuffle: bool,
    random_state: Option<u64>,
    skip_user_error: bool,
}

impl Default for PartitioningConfig {
    fn default() -> Self {
        PartitioningConfig::kfold(DEFAULT_N_SPLITS)
    }
}

impl PartitioningConfig {
    /// K-fold partitioning with `n_splits` folds.
    pub fn kfold(n_splits: usize) -> Self {
        PartitioningConfig::with_technique(Technique::KFold(n_splits))
    }

    /// Hold-out partitioning keeping `train_set_size` of each user's
    /// interactions for training.
    pub fn hold_out(train_set_size: f64) -> Self {
        PartitioningConfig::with_technique(Technique::HoldOut(train_set_size))
    }

    fn with_technique(technique: Technique) -> Self {
        PartitioningConfig {
            technique,
            shuffle: true,
            random_state: None,
            skip_user_error: true,
        }
    }

    /// Set whether interactions are shuffled before splitting.
    pub fn shuffle(mut self, shuffle: bool) -> Self {
        self.shuffle = shuffle;
        self
    }

    /// Seed the shuffling, making splits reproducible.
    pub fn random_state(mut self, random_state: u64) -> Self {
        self.random_state = Some(random_state);
        self
    }

    /// Set whether users that cannot be split are skipped (with a warning)
    /// instead of failing the whole partitioning.
    pub fn skip_user_error(mut self, skip_user_error: bool) -> Self {
        self.skip_user_error = skip_user_error;
        self
    }

    /// Validate the parameters.
    pub fn build(self) -> Result<Partitioning, ConfigurationError> {
        let strategy = match self.technique {
            Technique::KFold(n_splits) => {
                Strategy::KFold(KFold::new(n_splits, self.shuffle, self.random_state)?)
            }
            Technique::HoldOut(train_set_size) => Strategy::HoldOut(HoldOut::new(
                train_set_size,
                self.shuffle,
                self.random_state,
            )?),
        };

        Ok(Partitioning {
            strategy,
            skip_user_error: self.skip_user_error,
        })
    }
}

fn build_rng(random_state: Option<u64>) -> XorShiftRng {
    match random_state {
        Some(seed) => {
            let mut bytes = [0; 16];
            bytes[..8].copy_from_slice(&seed.to_le_bytes());
            bytes[8..].copy_from_slice(&(!seed).to_le_bytes());
            XorShiftRng::from_seed(bytes)
        }
        None => XorShiftRng::from_seed(rand::thread_rng().gen()),
    }
}

/// K-fold splitting.
///
/// The user's interactions are cut into `n_splits` contiguous blocks of
/// near-equal size, the first `n % n_splits` blocks holding one extra
/// interaction. Fold `k` tests on block `k` and trains on the rest. When
/// shuffling, blocks are drawn from a random permutation; train and test
/// keep the user's original order either way.
#[derive(Clone, Debug, PartialEq)]
pub struct KFold {
    n_splits: usize,
    shuffle: bool,
    random_state: Option<u64>,
}

impl KFold {
    /// Create a K-fold splitter. Fails if `n_splits < 2`.
    pub fn new(
        n_splits: usize,
        shuffle: bool,
        random_state: Option<u64>,
    ) -> Result<Self, ConfigurationError> {
        if n_splits < 2 {
            return Err(ConfigurationError::InvalidNumSplits(n_splits));
        }

        Ok(KFold {
            n_splits,
            shuffle,
            random_state,
        })
    }

    /// Number of folds.
    pub fn n_splits(&self) -> usize {
        self.n_splits
    }

    /// Split one user's interactions into `n_splits` folds.
    pub fn split_single(
        &self,
        user_interactions: &[Interaction],
    ) -> Result<UserFolds, InsufficientDataError> {
        let n_interactions = user_interactions.len();

        if self.n_splits > n_interactions {
            return Err(InsufficientDataError::TooFewInteractions {
                n_splits: self.n_splits,
                n_interactions,
            });
        }

        let mut indices: Vec<usize> = (0..n_interactions).collect();

        if self.shuffle {
            build_rng(self.random_state).shuffle(&mut indices);
        }

        let mut fold_of = vec![0; n_interactions];
        let mut start = 0;

        for fold in 0..self.n_splits {
            let mut fold_size = n_interactions / self.n_splits;
            if fold < n_interactions % self.n_splits {
                fold_size += 1;
            }

            for &idx in &indices[start..start + fold_size] {
                fold_of[idx] = fold;
            }

            start += fold_size;
        }

        let mut train = vec![Vec::new(); self.n_splits];
        let mut test = vec![Vec::new(); self.n_splits];

        for (interaction, &test_fold) in user_interactions.iter().zip(fold_of.iter()) {
            for fold in 0..self.n_splits {
                if fold == test_fold {
                    test[fold].push(interaction.clone());
                } else {
                    train[fold].push(interaction.clone());
                }
            }
        }

        Ok((train, test))
    }
}

impl fmt::Display for KFold {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "KFoldPartitioningTechnique")
    }
}

/// Hold-out splitting.
///
/// Produces a single fold with `floor(train_set_size * n)` train
/// interactions and the rest in test. When shuffling, the test set is the
/// head of a random permutation; otherwise the train set is the head of
/// the user's interactions.
#[derive(Clone, Debug, PartialEq)]
pub struct HoldOut {
    train_set_size: f64,
    shuffle: bool,
    random_state: Option<u64>,
}

impl HoldOut {
    /// Create a hold-out splitter. Fails unless `0 < train_set_size < 1`.
    pub fn new(
        train_set_size: f64,
        shuffle: bool,
        random_state: Option<u64>,
    ) -> Result<Self, ConfigurationError> {
        if !(train_set_size > 0.0 && train_set_size < 1.0) {
            return Err(ConfigurationError::InvalidTrainSetSize(train_set_size));
        }

        Ok(HoldOut {
            train_set_size,
            shuffle,
            random_state,
        })
    }

    /// Fraction of each user's interactions kept for training.
    pub fn train_set_size(&self) -> f64 {
        self.train_set_size
    }

    /// Split one user's interactions into a single train/test fold.
    pub fn split_single(
        &self,
        user_interactions: &[Interaction],
    ) -> Result<UserFolds, InsufficientDataError> {
        let n_interactions = user_interactions.len();
        let n_train = (self.train_set_size * n_interactions as f64).floor() as usize;
        let n_test = n_interactions - n_train;

        if n_train == 0 {
            return Err(InsufficientDataError::EmptyTrainSet {
                n_interactions,
                train_set_size: self.train_set_size,
            });
        }

        let (train, test) = if self.shuffle {
            let mut indices: Vec<usize> = (0..n_interactions).collect();
            build_rng(self.random_state).shuffle(&mut indices);

            let (test_indices, train_indices) = indices.split_at(n_test);
            let pick = |indices: &[usize]| -> Vec<Interaction> {
                indices
                    .iter()
                    .map(|&idx| user_interactions[idx].clone())
                    .collect()
            };

            (pick(train_indices), pick(test_indices))
        } else {
            let (train, test) = user_interactions.split_at(n_train);
            (train.to_vec(), test.to_vec())
        };

        Ok((vec![train], vec![test]))
    }
}

impl fmt::Display for HoldOut {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "HoldOutPartitioningTechnique")
    }
}

/// A validated splitting technique.
#[derive(Clone, Debug, PartialEq)]
pub enum Strategy {
    /// K-fold splitting.
    KFold(KFold),
    /// Hold-out splitting.
    HoldOut(HoldOut),
}

/// Splits ratings into train/test folds, user by user.
#[derive(Clone, Debug, PartialEq)]
pub struct Partitioning {
    strategy: Strategy,
    skip_user_error: bool,
}

impl Partitioning {
    /// The splitting technique.
    pub fn strategy(&self) -> &Strategy {
        &self.strategy
    }

    /// Whether users that cannot be split are skipped.
    pub fn skip_user_error(&self) -> bool {
        self.skip_user_error
    }

    /// Number of folds every successfully split user contributes to.
    pub fn num_folds(&self) -> usize {
        match self.strategy {
            Strategy::KFold(ref kfold) => kfold.n_splits(),
            Strategy::HoldOut(_) => 1,
        }
    }

    /// Split one user's interactions.
    pub fn split_single(
        &self,
        user_interactions: &[Interaction],
    ) -> Result<UserFolds, InsufficientDataError> {
        match self.strategy {
            Strategy::KFold(ref kfold) => kfold.split_single(user_interactions),
            Strategy::HoldOut(ref hold_out) => hold_out.split_single(user_interactions),
        }
    }

    /// Split `ratings` for `user_ids` (all users of `ratings` if `None`).
    ///
    /// Returns the train and test collections of every fold, ordered by fold
    /// index. Within a fold, interactions are grouped by user in the order
    /// users were given; repeated ids are split once. Users that cannot be split are skipped with a
    /// warning if `skip_user_error` is set; otherwise the first of them, in
    /// user order, fails the whole call. If no user can be split both lists
    /// are empty.
    pub fn split_all<P: Progress + ?Sized>(
        &self,
        ratings: &Ratings,
        user_ids: Option<&[UserId]>,
        progress: &P,
    ) -> Result<(Vec<Ratings>, Vec<Ratings>), PartitioningError> {
        let user_ids: Vec<&UserId> = user_ids
            .unwrap_or_else(|| ratings.user_ids())
            .iter()
            .unique()
            .collect();

        progress.set_description(&format!("Performing {}", self));
        progress.set_length(user_ids.len());

        let user_folds: Vec<_> = user_ids
            .par_iter()
            .map(|user_id| {
                let user_interactions = ratings.get_user_interactions(user_id);
                let folds = self.split_single(&user_interactions);
                progress.tick();
                folds
            })
            .collect();

        let mut train_folds: Vec<Vec<Interaction>> = Vec::new();
        let mut test_folds: Vec<Vec<Interaction>> = Vec::new();
        let mut num_skipped = 0usize;

        for (user_id, folds) in user_ids.iter().zip(user_folds) {
            match folds {
                Ok((user_train, user_test)) => {
                    if train_folds.is_empty() {
                        train_folds = vec![Vec::new(); self.num_folds()];
                        test_folds = vec![Vec::new(); self.num_folds()];
                    }

                    for (fold, single_train, single_test) in izip!(0.., user_train, user_test) {
                        train_folds[fold].extend(single_train);
                        test_folds[fold].extend(single_test);
                    }
                }
                Err(cause) => {
                    if !self.skip_user_error {
                        return Err(PartitioningError {
                            user_id: (*user_id).clone(),
                            cause,
                        });
                    }

                    warn!(user_id = %user_id, "{}\nThe user {} will be skipped", cause, user_id);
                    num_skipped += 1;
                }
            }
        }

        debug!(
            technique = %self,
            num_users = user_ids.len(),
            num_skipped = num_skipped,
            num_folds = train_folds.len(),
            "Partitioning finished"
        );

        Ok((
            train_folds.into_iter().map(Ratings::from).collect(),
            test_folds.into_iter().map(Ratings::from).collect(),
        ))
    }

    /// Like [`Partitioning::split_all`], pairing each fold's train and test
    /// collections into a [`Split`].
    pub fn split_all_into_splits<P: Progress + ?Sized>(
        &self,
        ratings: &Ratings,
        user_ids: Option<&[UserId]>,
        progress: &P,
    ) -> Result<Vec<Split>, PartitioningError> {
        let (train, test) = self.split_all(ratings, user_ids, progress)?;

        Ok(train
            .into_iter()
            .zip(test)
            .map(|(train, test)| Split::new(train, test))
            .collect())
    }
}

impl fmt::Display for Partitioning {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.strategy {
            Strategy::KFold(ref kfold) => kfold.fmt(f),
            Strategy::HoldOut(ref hold_out) => hold_out.fmt(f),
        }
    }
}
