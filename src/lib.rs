#![deny(missing_docs)]
//! # recsplit
//!
//! `recsplit` implements the data-handling side of recommender evaluation:
//! partitioning each user's interactions into train/test folds that line up
//! across users, and extracting and filtering user profiles for graph-based
//! recommendation algorithms.
//!
//! ## Example
//! Split a small dataset into three K-fold folds:
//!
//! ```rust
//! # extern crate recsplit;
//! use recsplit::data::{Interaction, Ratings};
//! use recsplit::partitioning::PartitioningConfig;
//! use recsplit::progress::NoProgress;
//!
//! let interactions = (0..9)
//!     .map(|idx| Interaction::new("u1", format!("i{}", idx), 1.0))
//!     .collect::<Vec<_>>();
//! let ratings = Ratings::from_list(interactions);
//!
//! let partitioning = PartitioningConfig::kfold(3)
//!     .random_state(42)
//!     .build()
//!     .unwrap();
//!
//! let (train, test) = partitioning.split_all(&ratings, None, &NoProgress).unwrap();
//!
//! assert_eq!(train.len(), 3);
//! for (train_fold, test_fold) in train.iter().zip(test.iter()) {
//!     assert_eq!(train_fold.len(), 6);
//!     assert_eq!(test_fold.len(), 3);
//! }
//! ```
#[macro_use]
extern crate serde_derive;

#[macro_use]
extern crate itertools;

#[macro_use]
extern crate failure;

#[macro_use]
extern crate tracing;

extern crate csv;
extern crate indicatif;
extern crate petgraph;
extern crate rand;
extern crate rayon;
extern crate serde;

pub mod algorithm;
pub mod data;
pub mod graph;
pub mod partitioning;
pub mod progress;

/// Alias for user identifiers.
pub type UserId = String;
/// Alias for item identifiers.
pub type ItemId = String;
/// Alias for interaction scores.
pub type Score = f32;
/// Alias for timestamps.
pub type Timestamp = u64;
