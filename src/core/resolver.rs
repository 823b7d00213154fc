use std::collections::HashMap;

use crate::models::{MatchView, MatchedPartner, ProfileCard, UserPreference};

/// Join mutual partners with their display cards and preferences
///
/// Partner order is preserved (most recent match first). Missing cards or
/// preferences leave the corresponding fields empty.
pub fn build_match_views(
    partners: Vec<MatchedPartner>,
    cards: Vec<ProfileCard>,
    preferences: Vec<UserPreference>,
) -> Vec<MatchView> {
    let cards: HashMap<String, ProfileCard> =
        cards.into_iter().map(|c| (c.uid.clone(), c)).collect();
    let locations: HashMap<String, String> = preferences
        .into_iter()
        .map(|p| (p.uid, p.location))
        .collect();

    partners
        .into_iter()
        .map(|partner| {
            let card = cards.get(&partner.uid);
            MatchView {
                display_name: card.map(|c| c.display_name.clone()),
                image_url: card.and_then(|c| c.image_url.clone()),
                location: locations.get(&partner.uid).cloned(),
                matched_at: partner.matched_at,
                uid: partner.uid,
            }
        })
        .collect()
}
