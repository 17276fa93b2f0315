//! Turning the relay situation into a mission task graph.

use rand::seq::SliceRandom;
use rand::Rng;
use skuttle_shared::{MultiserverAddress, PubAnnouncement, Star};

use super::graph::TaskGraph;
use super::SyncQuality;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MissionTask {
    /// Redeem the invite, then announce the relay (and follow it when
    /// `follow` is set).
    RedeemInvite { star: Star, follow: bool },
    /// Connect to `peers` and let the log store gossip.
    Sync {
        peers: Vec<MultiserverAddress>,
        quality: SyncQuality,
    },
}

/// Build the task graph of one mission.
///
/// Stars already announced as pubs count as available. When fewer than
/// `minimum` are, a random sample of the remaining stars covering the
/// deficit gets its invites redeemed, and the final sync waits for every
/// redemption. The sync candidates are all stars, redeemed or not.
pub fn plan_mission<R: Rng + ?Sized>(
    stars: &[Star],
    pubs: &[PubAnnouncement],
    minimum: usize,
    quality: SyncQuality,
    rng: &mut R,
) -> TaskGraph<MissionTask> {
    let (available, untried): (Vec<&Star>, Vec<&Star>) = stars
        .iter()
        .partition(|star| pubs.iter().any(|p| p.address.key == star.feed));

    let mut graph = TaskGraph::new();
    let peers: Vec<MultiserverAddress> = available
        .iter()
        .chain(untried.iter())
        .map(|star| star.to_peer())
        .collect();

    let missing = minimum.saturating_sub(available.len());
    let mut redeems = Vec::new();
    if missing > 0 {
        for star in untried.choose_multiple(rng, missing) {
            redeems.push(graph.add(
                MissionTask::RedeemInvite {
                    star: (*star).clone(),
                    follow: false,
                },
                &[],
            ));
        }
    }

    graph.add(MissionTask::Sync { peers, quality }, &redeems);
    graph
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::star;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn redeemed(graph: &TaskGraph<MissionTask>) -> Vec<Star> {
        graph
            .iter()
            .filter_map(|(_, task)| match task {
                MissionTask::RedeemInvite { star, .. } => Some(star.clone()),
                MissionTask::Sync { .. } => None,
            })
            .collect()
    }

    #[test]
    fn test_deficit_of_two_redeems_two() {
        let stars = vec![star(10), star(11), star(12), star(13), star(14)];
        let pubs = vec![stars[0].to_pub()];
        let mut rng = StdRng::seed_from_u64(7);

        let graph = plan_mission(&stars, &pubs, 3, SyncQuality::High, &mut rng);

        assert_eq!(graph.len(), 3);
        let invites = redeemed(&graph);
        assert_eq!(invites.len(), 2);
        assert!(!invites.contains(&stars[0]));

        let (sync_id, sync) = graph
            .iter()
            .find(|(_, task)| matches!(task, MissionTask::Sync { .. }))
            .unwrap();
        let redeem_ids: Vec<_> = graph
            .iter()
            .filter(|(_, task)| matches!(task, MissionTask::RedeemInvite { .. }))
            .map(|(id, _)| id)
            .collect();
        assert_eq!(graph.dependencies(sync_id), redeem_ids.as_slice());

        let MissionTask::Sync { peers, quality } = sync else {
            unreachable!()
        };
        assert_eq!(*quality, SyncQuality::High);
        // every star is a candidate, not only the redeemed sample
        assert_eq!(peers.len(), 5);
        assert_eq!(peers[0], stars[0].to_peer());
        assert!(stars.iter().all(|s| peers.contains(&s.to_peer())));
    }

    #[test]
    fn test_enough_stars_only_syncs() {
        let stars = vec![star(10), star(11), star(12), star(13)];
        let pubs: Vec<_> = stars[..3].iter().map(Star::to_pub).collect();
        let mut rng = StdRng::seed_from_u64(7);

        let graph = plan_mission(&stars, &pubs, 3, SyncQuality::Low, &mut rng);

        assert_eq!(graph.len(), 1);
        let (id, task) = graph.iter().next().unwrap();
        assert!(graph.dependencies(id).is_empty());
        assert!(matches!(task, MissionTask::Sync { peers, .. } if peers.len() == 4));
    }

    #[test]
    fn test_sample_limited_by_untried_stars() {
        let stars = vec![star(10)];
        let mut rng = StdRng::seed_from_u64(1);

        let graph = plan_mission(&stars, &[], 3, SyncQuality::High, &mut rng);

        assert_eq!(redeemed(&graph), stars);
        assert_eq!(graph.len(), 2);
    }

    #[test]
    fn test_sample_is_random_subset() {
        let stars: Vec<_> = (10..20).map(star).collect();
        let mut rng = StdRng::seed_from_u64(42);

        let graph = plan_mission(&stars, &[], 3, SyncQuality::High, &mut rng);
        let invites = redeemed(&graph);

        assert_eq!(invites.len(), 3);
        assert!(invites.iter().all(|s| stars.contains(s)));
        assert!(invites[0] != invites[1] && invites[1] != invites[2] && invites[0] != invites[2]);
    }
}
