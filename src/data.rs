//! Interaction containers.
use std::collections::HashMap;
use std::io;
use std::path::Path;

use csv;
use failure;

use super::{ItemId, Score, Timestamp, UserId};

/// A single user-item event.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct Interaction {
    user_id: UserId,
    item_id: ItemId,
    score: Score,
    #[serde(default)]
    timestamp: Option<Timestamp>,
}

impl Interaction {
    /// Create a new interaction without a timestamp.
    pub fn new<U: Into<UserId>, I: Into<ItemId>>(user_id: U, item_id: I, score: Score) -> Self {
        Interaction {
            user_id: user_id.into(),
            item_id: item_id.into(),
            score,
            timestamp: None,
        }
    }

    /// Attach a timestamp to the interaction.
    pub fn with_timestamp(mut self, timestamp: Timestamp) -> Self {
        self.timestamp = Some(timestamp);
        self
    }
}

impl Interaction {
    /// The user who interacted.
    pub fn user_id(&self) -> &str {
        &self.user_id
    }
    /// The item interacted with.
    pub fn item_id(&self) -> &str {
        &self.item_id
    }
    /// The interaction score.
    pub fn score(&self) -> Score {
        self.score
    }
    /// When the interaction happened, if known.
    pub fn timestamp(&self) -> Option<Timestamp> {
        self.timestamp
    }
}

/// An ordered collection of interactions, indexed by user.
///
/// The per-user index preserves the relative order of each user's
/// interactions, and users are listed in order of first appearance.
#[derive(Clone, Debug, Default)]
pub struct Ratings {
    interactions: Vec<Interaction>,
    user_ids: Vec<UserId>,
    user_index: HashMap<UserId, Vec<usize>>,
}

impl Ratings {
    /// Create an empty collection.
    pub fn new() -> Self {
        Ratings::default()
    }

    /// Build a fresh collection from a flat list of interactions.
    pub fn from_list(interactions: Vec<Interaction>) -> Self {
        Ratings::from(interactions)
    }

    /// Read interactions from CSV data with a
    /// `user_id,item_id,score,timestamp` header. The timestamp
    /// column may be empty or missing.
    pub fn from_reader<R: io::Read>(reader: R) -> Result<Self, failure::Error> {
        let mut reader = csv::Reader::from_reader(reader);
        let interactions: Vec<Interaction> = reader.deserialize().collect::<Result<Vec<_>, _>>()?;

        Ok(Ratings::from(interactions))
    }

    /// Read interactions from a CSV file. See [`Ratings::from_reader`].
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, failure::Error> {
        let mut reader = csv::Reader::from_path(path)?;
        let interactions: Vec<Interaction> = reader.deserialize().collect::<Result<Vec<_>, _>>()?;

        Ok(Ratings::from(interactions))
    }

    /// All interactions, in insertion order.
    pub fn data(&self) -> &[Interaction] {
        &self.interactions
    }

    /// Number of interactions.
    pub fn len(&self) -> usize {
        self.interactions.len()
    }

    /// Whether there are no interactions at all.
    pub fn is_empty(&self) -> bool {
        self.interactions.is_empty()
    }

    /// Distinct user ids, in order of first appearance.
    pub fn user_ids(&self) -> &[UserId] {
        &self.user_ids
    }

    /// Number of distinct users.
    pub fn num_users(&self) -> usize {
        self.user_ids.len()
    }

    /// The interactions of `user_id`, in their original relative order.
    /// Unknown users have no interactions.
    pub fn get_user_interactions(&self, user_id: &str) -> Vec<Interaction> {
        self.user_index
            .get(user_id)
            .map(|positions| {
                positions
                    .iter()
                    .map(|&idx| self.interactions[idx].clone())
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl From<Vec<Interaction>> for Ratings {
    fn from(data: Vec<Interaction>) -> Ratings {
        let mut user_ids = Vec::new();
        let mut user_index: HashMap<UserId, Vec<usize>> = HashMap::new();

        for (idx, interaction) in data.iter().enumerate() {
            user_index
                .entry(interaction.user_id.clone())
                .or_insert_with(|| {
                    user_ids.push(interaction.user_id.clone());
                    Vec::new()
                })
                .push(idx);
        }

        Ratings {
            interactions: data,
            user_ids,
            user_index,
        }
    }
}

/// A pair of interaction collections.
///
/// Depending on where it comes from, a split holds either a train and a
/// test set, or a set of predictions and the ground truth they should be
/// compared against. Both name pairs read the same two collections:
///
/// | first     | second     |
/// |-----------|------------|
/// | `train()` | `test()`   |
/// | `pred()`  | `truth()`  |
#[derive(Clone, Debug)]
pub struct Split {
    first: Ratings,
    second: Ratings,
}

impl Split {
    /// Pair two collections.
    pub fn new(first: Ratings, second: Ratings) -> Self {
        Split { first, second }
    }

    /// The first collection.
    pub fn first(&self) -> &Ratings {
        &self.first
    }

    /// The second collection.
    pub fn second(&self) -> &Ratings {
        &self.second
    }

    /// The train set.
    pub fn train(&self) -> &Ratings {
        &self.first
    }

    /// The test set.
    pub fn test(&self) -> &Ratings {
        &self.second
    }

    /// The predictions.
    pub fn pred(&self) -> &Ratings {
        &self.first
    }

    /// The ground truth.
    pub fn truth(&self) -> &Ratings {
        &self.second
    }

    /// Take both collections out of the split.
    pub fn into_parts(self) -> (Ratings, Ratings) {
        (self.first, self.second)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item_ids(interactions: &[Interaction]) -> Vec<&str> {
        interactions.iter().map(|x| x.item_id()).collect()
    }

    #[test]
    fn user_index_preserves_order() {
        let ratings = Ratings::from_list(vec![
            Interaction::new("u2", "i1", 1.0),
            Interaction::new("u1", "i2", 2.0),
            Interaction::new("u2", "i3", 3.0),
            Interaction::new("u1", "i4", 4.0),
            Interaction::new("u2", "i5", 5.0),
        ]);

        assert_eq!(ratings.len(), 5);
        assert_eq!(ratings.user_ids(), &["u2".to_owned(), "u1".to_owned()]);
        assert_eq!(
            item_ids(&ratings.get_user_interactions("u2")),
            vec!["i1", "i3", "i5"]
        );
        assert_eq!(
            item_ids(&ratings.get_user_interactions("u1")),
            vec!["i2", "i4"]
        );
        assert!(ratings.get_user_interactions("u3").is_empty());
    }

    #[test]
    fn empty_ratings() {
        let ratings = Ratings::from_list(Vec::new());

        assert!(ratings.is_empty());
        assert_eq!(ratings.num_users(), 0);
    }

    #[test]
    fn read_csv() {
        let data = "user_id,item_id,score,timestamp\n\
                    u1,i1,4.0,100\n\
                    u1,i2,3.5,\n\
                    u2,i1,1,200\n";

        let ratings = Ratings::from_reader(data.as_bytes()).unwrap();

        assert_eq!(ratings.len(), 3);
        assert_eq!(ratings.num_users(), 2);

        let first = &ratings.data()[0];
        assert_eq!(first.user_id(), "u1");
        assert_eq!(first.score(), 4.0);
        assert_eq!(first.timestamp(), Some(100));
        assert_eq!(ratings.data()[1].timestamp(), None);
    }

    #[test]
    fn read_csv_without_timestamps() {
        let data = "user_id,item_id,score\nu1,i1,2.0\n";

        let ratings = Ratings::from_reader(data.as_bytes()).unwrap();

        assert_eq!(ratings.data(), &[Interaction::new("u1", "i1", 2.0)]);
    }

    #[test]
    fn read_malformed_csv() {
        let data = "user_id,item_id,score\nu1,i1,not-a-number\n";

        assert!(Ratings::from_reader(data.as_bytes()).is_err());
    }

    #[test]
    fn split_aliases() {
        let first = Ratings::from_list(vec![Interaction::new("u1", "i1", 1.0)]);
        let second = Ratings::from_list(vec![
            Interaction::new("u1", "i2", 1.0),
            Interaction::new("u1", "i3", 1.0),
        ]);

        let split = Split::new(first, second);

        assert_eq!(split.train().len(), 1);
        assert_eq!(split.pred().len(), 1);
        assert_eq!(split.first().len(), 1);
        assert_eq!(split.test().len(), 2);
        assert_eq!(split.truth().len(), 2);
        assert_eq!(split.second().len(), 2);

        let (train, test) = split.into_parts();
        assert_eq!(train.len() + test.len(), 3);
    }
}
