use std::collections::HashSet;

use rand::{seq::SliceRandom, Rng};

/// Playable items discovered once per run. Never shrinks: draws are with replacement.
#[derive(Debug, Clone, Default)]
pub struct ContentPool {
    items: Vec<String>,
}

impl ContentPool {
    /// Dedups by exact URL and shuffles once.
    pub fn build<I, R>(links: I, rng: &mut R) -> Self
    where
        I: IntoIterator<Item = String>,
        R: Rng + ?Sized,
    {
        let mut seen = HashSet::new();
        let mut items: Vec<String> = links.into_iter().filter(|l| seen.insert(l.clone())).collect();
        items.shuffle(rng);

        ContentPool { items }
    }

    pub fn choose<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<&str> {
        self.items.choose(rng).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[String] {
        &self.items
    }
}

#[cfg(test)]
mod test {
    use rand::{rngs::StdRng, SeedableRng};

    use super::*;

    fn links(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn each_url_once() {
        let mut rng = StdRng::seed_from_u64(7);
        let raw = links(&[
            "https://open.spotify.com/track/a",
            "https://open.spotify.com/track/b",
            "https://open.spotify.com/track/a",
            "https://open.spotify.com/track/c",
            "https://open.spotify.com/track/b",
            "https://open.spotify.com/track/a?si=1",
        ]);
        let pool = ContentPool::build(raw, &mut rng);

        assert_eq!(pool.len(), 4);
        let mut items = pool.items().to_vec();
        items.sort();
        items.dedup();
        assert_eq!(items.len(), 4);
    }

    #[test]
    fn merges_several_listings() {
        let mut rng = StdRng::seed_from_u64(1);
        let first = links(&["x", "y"]);
        let second = links(&["y", "z"]);
        let pool = ContentPool::build(first.into_iter().chain(second), &mut rng);

        let mut items = pool.items().to_vec();
        items.sort();
        assert_eq!(items, links(&["x", "y", "z"]));
    }

    #[test]
    fn choose_never_consumes() {
        let mut rng = StdRng::seed_from_u64(3);
        let pool = ContentPool::build(links(&["only"]), &mut rng);
        for _ in 0..5 {
            assert_eq!(pool.choose(&mut rng), Some("only"));
        }
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn empty_pool() {
        let mut rng = StdRng::seed_from_u64(0);
        let pool = ContentPool::build(Vec::new(), &mut rng);
        assert!(pool.is_empty());
        assert_eq!(pool.choose(&mut rng), None);
    }
}
