use std::collections::HashSet;
use uuid::Uuid;

use crate::models::{PostSnapshot, PostVisibility};

/// The pets a viewer owns and the pets those pets follow.
///
/// Resolved once per request by an `AudienceResolver`; the visibility check
/// itself is pure.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewerScope {
    pub viewer_id: Uuid,
    pub owned_pets: HashSet<Uuid>,
    pub followed_pets: HashSet<Uuid>,
}

impl ViewerScope {
    pub fn new(viewer_id: Uuid) -> Self {
        Self {
            viewer_id,
            ..Default::default()
        }
    }

    pub fn with_owned<I: IntoIterator<Item = Uuid>>(mut self, pets: I) -> Self {
        self.owned_pets.extend(pets);
        self
    }

    pub fn with_followed<I: IntoIterator<Item = Uuid>>(mut self, pets: I) -> Self {
        self.followed_pets.extend(pets);
        self
    }

    pub fn owns(&self, pet_id: &Uuid) -> bool {
        self.owned_pets.contains(pet_id)
    }

    pub fn follows(&self, pet_id: &Uuid) -> bool {
        self.followed_pets.contains(pet_id)
    }

    /// Whether the viewer may see `post` given its visibility and author pet
    pub fn can_view(&self, post: &PostSnapshot) -> bool {
        match post.visibility {
            PostVisibility::Public => true,
            PostVisibility::Followers => self.owns(&post.pet_id) || self.follows(&post.pet_id),
            PostVisibility::Private => self.owns(&post.pet_id),
        }
    }

    /// Author pets whose posts make up the viewer's home feed
    pub fn home_authors(&self) -> Vec<Uuid> {
        let mut authors: Vec<Uuid> = self
            .owned_pets
            .union(&self.followed_pets)
            .copied()
            .collect();
        authors.sort();
        authors
    }
}

/// Who a feed is being assembled for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedAudience {
    /// Anonymous or global view: public posts only
    Public,
    /// Signed-in viewer: visibility checked against the viewer's pets
    Viewer(ViewerScope),
}

impl FeedAudience {
    pub fn admits(&self, post: &PostSnapshot) -> bool {
        match self {
            FeedAudience::Public => post.visibility == PostVisibility::Public,
            FeedAudience::Viewer(scope) => scope.can_view(post),
        }
    }
}
