use serde::{Deserialize, Serialize};
use super::helpers;
use crate::comments::CommentNode;
use crate::db::entities::*;
use crate::ratings::RatingSummary;
use crate::utils::time_utils::{self, DateFormat};
use crate::utils::text_utils;
use crate::config::SiteInfo;

// Entities go out through these DTOs, converted with From.
// Dates become ISO strings, keys are camelCase.

// Same fields either way.
pub use crate::db::entities::Tag as TagDto;

fn iso(timestamp: i64) -> String {
  time_utils::timestamp_to_date_string(timestamp, DateFormat::Iso)
}

#[derive(Debug, Serialize, Deserialize)]
pub struct JsonStatus {
  pub success: bool,
  pub message: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub id: Option<i64>
}

impl JsonStatus {
  pub fn success(message: &str) -> Self {
    Self {
      success: true,
      message: String::from(message),
      id: None
    }
  }

  pub fn success_with_id(message: &str, id: i64) -> Self {
    Self {
      success: true,
      message: String::from(message),
      id: Some(id)
    }
  }

  pub fn failure(message: &str) -> Self {
    Self {
      success: false,
      message: String::from(message),
      id: None
    }
  }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CategoryRefDto {
  pub name: String,
  pub slug: String
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostDto {
  pub id: i64,
  pub title: String,
  pub slug: String,
  pub excerpt: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub content: Option<String>,
  pub status: PostStatus,
  pub author: Option<String>,
  pub category: Option<CategoryRefDto>,
  pub tags: Vec<TagDto>,
  pub featured_image: Option<String>,
  pub view_count: i64,
  pub rating: f64,
  pub rating_count: i64,
  pub seo: SeoFields,
  pub published_at: Option<String>,
  pub scheduled_at: Option<String>,
  pub created_at: String,
  pub updated_at: String
}

impl From<Post> for PostDto {
  fn from(post: Post) -> Self {
    let category = match (post.category_name, post.category_slug) {
      (Some(name), Some(slug)) => Some(CategoryRefDto { name, slug }),
      _ => None
    };
    Self {
      id: post.id,
      title: post.title,
      slug: post.slug,
      excerpt: post.excerpt,
      content: post.content,
      status: post.status,
      author: post.author_name,
      category,
      tags: post.tags,
      featured_image: post.featured_image,
      view_count: post.view_count,
      rating: post.rating,
      rating_count: post.rating_count,
      seo: post.seo,
      published_at: post.published_at.map(iso),
      scheduled_at: post.scheduled_at.map(iso),
      created_at: iso(post.created_at),
      updated_at: iso(post.updated_at)
    }
  }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostPageDto {
  pub count: usize,
  pub posts: Vec<PostDto>
}

// Email and IP address only show up in the moderation
// listing.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentDto {
  pub id: i64,
  pub post_id: i64,
  pub parent_id: Option<i64>,
  pub author: String,
  pub member: bool,
  pub content: String,
  pub rating: Option<i32>,
  pub status: CommentStatus,
  pub date: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub email: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub client_ip: Option<String>
}

impl From<Comment> for CommentDto {
  fn from(comment: Comment) -> Self {
    Self {
      id: comment.id,
      post_id: comment.post_id,
      parent_id: comment.parent_id,
      author: comment.author_name,
      member: comment.user_id.is_some(),
      content: comment.content,
      rating: comment.rating,
      status: comment.status,
      date: iso(comment.created_at),
      email: None,
      client_ip: None
    }
  }
}

impl CommentDto {
  pub fn for_moderation(comment: Comment) -> Self {
    let email = comment.author_email.clone();
    let client_ip = comment.client_ip.clone();
    Self {
      email: Some(email),
      client_ip,
      ..Self::from(comment)
    }
  }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModerationPageDto {
  pub status: CommentStatus,
  pub count: usize,
  pub comments: Vec<CommentDto>
}

/**
 * A comment in a thread. Replies nested deeper than the
 * collapse depth aren't indented any further: the comment
 * sitting at that depth is marked `collapsed` and gets all
 * its descendants as a flat list, with their count in
 * `hiddenReplies` for the "view N replies" link.
 */
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentThreadDto {
  #[serde(flatten)]
  pub comment: CommentDto,
  pub replies: Vec<CommentThreadDto>,
  pub collapsed: bool,
  pub hidden_replies: usize
}

impl CommentThreadDto {

  fn leaf(comment: Comment) -> Self {
    Self {
      comment: comment.into(),
      replies: Vec::new(),
      collapsed: false,
      hidden_replies: 0
    }
  }

  fn from_node(node: CommentNode, depth: usize, collapse_depth: usize) -> Self {
    if depth >= collapse_depth && !node.replies.is_empty() {
      let hidden_replies = node.descendant_count();
      let comment = node.comment.clone();
      let replies = node.into_flat_replies()
        .into_iter()
        .map(Self::leaf)
        .collect();
      return Self {
        comment: comment.into(),
        replies,
        collapsed: true,
        hidden_replies
      };
    }
    Self {
      comment: node.comment.into(),
      replies: node.replies.into_iter()
        .map(|reply| Self::from_node(reply, depth + 1, collapse_depth))
        .collect(),
      collapsed: false,
      hidden_replies: 0
    }
  }

  // Roots are at depth 0.
  pub fn from_tree(roots: Vec<CommentNode>, collapse_depth: usize) -> Vec<Self> {
    roots.into_iter()
      .map(|root| Self::from_node(root, 0, collapse_depth))
      .collect()
  }

}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentThreadsDto {
  pub count: usize,
  pub comments: Vec<CommentThreadDto>
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingResultDto {
  pub success: bool,
  pub rating: i32,
  pub post_rating: f64,
  pub post_rating_count: i64
}

impl RatingResultDto {
  pub fn new(rating: &Rating, summary: RatingSummary) -> Self {
    Self {
      success: true,
      rating: rating.value,
      post_rating: summary.average,
      post_rating_count: summary.count
    }
  }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryDto {
  pub id: i64,
  pub name: String,
  pub slug: String,
  pub description: Option<String>,
  pub parent_id: Option<i64>,
  pub subtopics: Vec<String>,
  pub created_at: String
}

impl From<Category> for CategoryDto {
  fn from(category: Category) -> Self {
    Self {
      id: category.id,
      name: category.name,
      slug: category.slug,
      description: category.description,
      parent_id: category.parent_id,
      subtopics: category.subtopics,
      created_at: iso(category.created_at)
    }
  }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationDto {
  pub id: i64,
  #[serde(rename = "type")]
  pub kind: NotificationKind,
  pub title: String,
  pub message: String,
  pub link: Option<String>,
  pub read: bool,
  pub date: String
}

impl From<Notification> for NotificationDto {
  fn from(notification: Notification) -> Self {
    Self {
      id: notification.id,
      kind: notification.kind,
      title: notification.title,
      message: notification.message,
      link: notification.link,
      read: notification.read,
      date: iso(notification.created_at)
    }
  }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnreadCountDto {
  pub unread: usize
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestimonialDto {
  pub id: i64,
  pub author_name: String,
  pub author_role: Option<String>,
  pub content: String,
  pub rating: Option<i32>,
  pub approved: bool,
  pub date: String
}

impl From<Testimonial> for TestimonialDto {
  fn from(t: Testimonial) -> Self {
    Self {
      id: t.id,
      author_name: t.author_name,
      author_role: t.author_role,
      content: t.content,
      rating: t.rating,
      approved: t.approved,
      date: iso(t.created_at)
    }
  }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FaqDto {
  pub id: i64,
  pub question: String,
  pub answer: String,
  pub position: i64,
  pub published: bool
}

impl From<Faq> for FaqDto {
  fn from(faq: Faq) -> Self {
    Self {
      id: faq.id,
      question: faq.question,
      answer: faq.answer,
      position: faq.position,
      published: faq.published
    }
  }
}

// Admins get the unsubscribe link to put in newsletter
// emails, the bare token stays out.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriberDto {
  pub id: i64,
  pub email: String,
  pub name: Option<String>,
  pub subscribed_at: String,
  pub unsubscribe_url: String
}

impl SubscriberDto {
  pub fn new(s: Subscriber, site_info: &SiteInfo) -> Self {
    Self {
      unsubscribe_url: format!(
        "{}/newsletter/unsubscribe/{}",
        site_info.root.trim_end_matches('/'),
        s.token
      ),
      id: s.id,
      email: s.email,
      name: s.name,
      subscribed_at: iso(s.created_at)
    }
  }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DayViewsDto {
  pub day: String,
  pub views: i64
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopPostDto {
  pub id: i64,
  pub title: String,
  pub slug: String,
  pub views: i64
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsDto {
  pub days: u32,
  pub total_views: usize,
  pub unique_visitors: usize,
  pub views_per_day: Vec<DayViewsDto>,
  pub top_posts: Vec<TopPostDto>
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdSenseStatDto {
  pub day: String,
  pub slot: String,
  pub impressions: i64,
  pub clicks: i64,
  pub earnings: f64
}

impl From<AdSenseStat> for AdSenseStatDto {
  fn from(stat: AdSenseStat) -> Self {
    Self {
      day: stat.day,
      slot: stat.slot,
      impressions: stat.impressions,
      clicks: stat.clicks,
      earnings: stat.earnings
    }
  }
}

#[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdSenseTotalsDto {
  pub impressions: i64,
  pub clicks: i64,
  pub earnings: f64,
  // Click-through rate in percent, one decimal.
  pub ctr: f64
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdSenseReportDto {
  pub from: String,
  pub to: String,
  pub stats: Vec<AdSenseStatDto>,
  pub totals: AdSenseTotalsDto
}

impl AdSenseReportDto {
  pub fn new(from: String, to: String, stats: Vec<AdSenseStat>) -> Self {
    let mut totals = stats.iter().fold(AdSenseTotalsDto::default(), |mut t, s| {
      t.impressions += s.impressions;
      t.clicks += s.clicks;
      t.earnings += s.earnings;
      t
    });
    if totals.impressions > 0 {
      let ctr = totals.clicks as f64 * 100.0 / totals.impressions as f64;
      totals.ctr = (ctr * 10.0).round() / 10.0;
    }
    Self {
      from,
      to,
      stats: stats.into_iter().map(Into::into).collect(),
      totals
    }
  }
}

// Data model of the RSS template.
#[derive(Serialize)]
pub struct RssFeed<'a> {
  pub title: &'a str,
  pub root: &'a str,
  pub description: &'a str,
  pub build_date: String,
  pub rss_full_url: &'a str,
  pub items: Vec<RssFeedEntry>,
  #[serde(skip)]
  site_info: &'a SiteInfo,
  #[serde(skip)]
  max_rss_length: usize
}

impl<'a> RssFeed<'a> {
  pub fn new(site_info: &'a SiteInfo, max_rss_length: usize) -> Self {
    Self {
      title: &site_info.title,
      root: &site_info.root,
      description: &site_info.description,
      build_date: time_utils::current_datetime_rfc2822(),
      rss_full_url: &site_info.rss_full_url,
      items: Vec::new(),
      site_info,
      max_rss_length
    }
  }

  pub fn add_item(&mut self, post: Post) {
    let link = helpers::post_url(self.site_info, &post.slug);
    let media = post.featured_image
      .map(|url| helpers::absolute_url(self.root, url));
    let mut description = post.content
      .filter(|c| !c.is_empty())
      .unwrap_or(post.excerpt);
    if description.chars().count() > self.max_rss_length {
      text_utils::truncate_utf8(&mut description, self.max_rss_length);
      description.push_str(&format!(
        "...<p><b><a href=\"{}\">Read the full post on the site</a></b></p>",
        link
      ));
    }
    // Content goes into a CDATA block, no escaping here.
    let description = text_utils::relative_links_to_absolute(
      &description,
      self.root
    );
    let date = post.published_at.unwrap_or(post.created_at);
    self.items.push(
      RssFeedEntry {
        title: post.title,
        link,
        date: time_utils::timestamp_to_date_string(date, DateFormat::Rfc2822),
        media,
        description
      }
    );
  }
}

#[derive(Serialize)]
pub struct RssFeedEntry {
  pub title: String,
  pub link: String,
  pub date: String,
  pub media: Option<String>,
  pub description: String
}

#[derive(Serialize)]
pub struct Sitemap {
  pub urls: Vec<SitemapEntry>
}

#[derive(Serialize)]
pub struct SitemapEntry {
  pub loc: String,
  pub lastmod: String
}

impl Sitemap {
  pub fn new(site_info: &SiteInfo, posts: Vec<Post>) -> Self {
    let mut urls = vec![SitemapEntry {
      loc: format!("{}/", site_info.root),
      lastmod: time_utils::timestamp_to_date_string(
        time_utils::current_timestamp(),
        DateFormat::USCompact
      )
    }];
    urls.extend(posts.into_iter().map(|post| SitemapEntry {
      loc: helpers::post_url(site_info, &post.slug),
      lastmod: time_utils::timestamp_to_date_string(post.updated_at, DateFormat::USCompact)
    }));
    Self { urls }
  }
}
