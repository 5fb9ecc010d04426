// Demo resources served by the binary and used by the integration tests:
// posts with comments (threaded through `parent`) and selections that
// collect posts.

use std::sync::Arc;

use crate::callback::{Callback, CallbackError, CascadeCleaner, VerifyReferencesValidator};
use crate::controller::Controller;
use crate::database::Store;
use crate::group::Group;
use crate::model::{Base, Declaration, Id, Model};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Post {
    pub base: Base,
    pub title: String,
    pub text_body: String,
}

impl Model for Post {
    fn declare(m: &mut Declaration<Self>) {
        m.base(r#"fire:"post:posts""#, |p| &p.base, |p| &mut p.base);
        m.field(
            "Title",
            r#"json:"title" valid:"required" fire:"filterable,sortable""#,
            |p| &p.title,
            |p| &mut p.title,
        );
        m.field(
            "TextBody",
            r#"json:"text-body" bson:"text_body""#,
            |p| &p.text_body,
            |p| &mut p.text_body,
        );
        m.has_many("Comments", r#"fire:"comments:comments:post""#);
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Comment {
    pub base: Base,
    pub message: String,
    pub post: Id,
    pub parent: Option<Id>,
}

impl Model for Comment {
    fn declare(m: &mut Declaration<Self>) {
        m.base(r#"fire:"comment:comments""#, |c| &c.base, |c| &mut c.base);
        m.field(
            "Message",
            r#"json:"message" fire:"filterable""#,
            |c| &c.message,
            |c| &mut c.message,
        );
        m.field("Post", r#"fire:"post:posts""#, |c| &c.post, |c| &mut c.post);
        m.field("Parent", r#"fire:"parent:comments""#, |c| &c.parent, |c| &mut c.parent);
        m.has_many("Replies", r#"fire:"replies:comments:parent""#);
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selection {
    pub base: Base,
    pub name: String,
    pub posts: Vec<Id>,
}

impl Model for Selection {
    fn declare(m: &mut Declaration<Self>) {
        m.base(r#"fire:"selection:selections""#, |s| &s.base, |s| &mut s.base);
        m.field(
            "Name",
            r#"json:"name" fire:"filterable,sortable""#,
            |s| &s.name,
            |s| &mut s.name,
        );
        m.field("Posts", r#"fire:"posts:posts""#, |s| &s.posts, |s| &mut s.posts);
    }
}

/// The demo resources mounted under `prefix`, each with `authorizer` (if any)
/// in front of it. Referenced ids must exist, and deleting a post removes its
/// comments.
pub fn group(
    prefix: impl Into<String>,
    store: Arc<dyn Store>,
    authorizer: Option<Arc<dyn Callback>>,
) -> Result<Group, CallbackError> {
    let with_auth = |controller: Controller| match &authorizer {
        Some(cb) => controller.authorizer(Arc::clone(cb)),
        None => controller,
    };

    let references: Arc<dyn Callback> = Arc::new(VerifyReferencesValidator::new());
    let post_cleaner = CascadeCleaner::new().with::<Comment>("post")?;
    let comment_cleaner = CascadeCleaner::new().with::<Comment>("parent")?;

    let posts = with_auth(Controller::new::<Post>()).cleaner(Arc::new(post_cleaner));
    let comments = with_auth(Controller::new::<Comment>())
        .validator(Arc::clone(&references))
        .cleaner(Arc::new(comment_cleaner));
    let selections = with_auth(Controller::new::<Selection>()).validator(references);

    Ok(Group::new(prefix, store).add(posts).add(comments).add(selections))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MemoryStore;
    use crate::model::{get_meta, RelationKind};

    #[test]
    fn demo_models_declare_cleanly() {
        let post = get_meta::<Post>();
        assert_eq!(post.plural, "posts");
        assert_eq!(post.attribute("text-body").map(|f| f.bson_name.as_str()), Some("text_body"));
        assert_eq!(post.relationship("comments").map(|f| f.relation), Some(RelationKind::HasMany));

        let comment = get_meta::<Comment>();
        let parent = comment.relationship("parent").unwrap();
        assert_eq!(parent.relation, RelationKind::ToOne);
        assert!(parent.optional);
        assert!(comment.relationship("post").unwrap().required);

        let selection = get_meta::<Selection>();
        assert_eq!(selection.relationship("posts").map(|f| f.relation), Some(RelationKind::ToMany));
    }

    #[test]
    fn demo_group_mounts_every_resource() {
        let group = group("/api", Arc::new(MemoryStore::new()), None).unwrap();
        assert_eq!(group.names(), vec!["comments", "posts", "selections"]);
    }
}
