//! Selectors of the movie listing site
//!
//! # Page shapes
//!
//! | Page | Element | Selector |
//! |------|---------|----------|
//! | Listing | tile | `.js-tile-link` (a link itself, or wrapping one) |
//! | Listing | load more | `button[data-qa='dlp-load-more-button']` |
//! | Detail | title | `h1[data-qa='score-panel-title']` |
//! | Detail | cast item | parent of `div.cast-wrap div.metadata` |
//! | Detail | metadata | `li.info-item` with `b` label and `span` value |
//! | Detail | scores | `score-board#scoreboard` attributes |
//! | Reviews | critic row | `.review-row` |
//! | Reviews | audience row | `.audience-review-row` |
//! | Reviews | next page | `.next`, enabled when its class list is exactly `next` |

use super::fields::{element_text, first_attr, first_text, selector};
use super::{
    split_list, ExtractResult, NextControl, ReviewEntryPoints, ReviewFields, SiteLayout,
};
use crate::records::{CastRecord, MovieRecord, ReviewKind};
use crate::url::resolve_href;
use scraper::{ElementRef, Html};
use url::Url;

const TILE: &str = ".js-tile-link";
const LOAD_MORE: &str = "button[data-qa='dlp-load-more-button']";
const NEXT_PAGE: &str = ".next";
const CONSENT_OVERLAY: &str = "#onetrust-policy";
const CONSENT_DISMISS: &str = "#onetrust-accept-btn-handler, #onetrust-policy .ot-link-btn";
const TITLE: &str = "h1[data-qa='score-panel-title']";
const CAST_METADATA: &str = "div.cast-wrap div.metadata";
const INFO_ITEM: &str = "li.info-item";
const CRITIC_ENTRY: &str = "a[data-qa='tomatometer-review-count']";
const AUDIENCE_ENTRY: &str = "a[data-qa='audience-rating-count']";

/// Layout of the movie listing site the harvester targets
#[derive(Debug, Clone, Copy, Default)]
pub struct TomatoLayout;

impl TomatoLayout {
    pub fn new() -> Self {
        Self
    }

    fn row_selector(kind: ReviewKind) -> &'static str {
        match kind {
            ReviewKind::Critic => ".review-row",
            ReviewKind::Audience => ".audience-review-row",
        }
    }

    fn critic_fields(row: ElementRef<'_>) -> ReviewFields {
        ReviewFields {
            posted_by: first_text(row, "a.display-name"),
            text: first_text(row, "p.review-text"),
            date_posted: first_text(row, "span[data-qa='review-date']"),
        }
    }

    fn audience_fields(row: ElementRef<'_>) -> ReviewFields {
        ReviewFields {
            posted_by: first_text(row, ".audience-reviews__name"),
            text: first_text(row, "p[data-qa='review-text']"),
            date_posted: first_text(row, "span.audience-reviews__duration"),
        }
    }

    fn cast_item(item: ElementRef<'_>, detail_url: &str, base: &Url) -> CastRecord {
        let profile_url =
            first_attr(item, "a[href]", "href").and_then(|href| resolve_href(base, &href));
        let name = first_attr(item, "img[alt]", "alt");
        let role = first_text(item, ".metadata p.p--small");

        CastRecord::new(detail_url, profile_url, name, role)
    }
}

impl SiteLayout for TomatoLayout {
    fn listing_tiles(&self, html: &str, base: &Url) -> Vec<Option<String>> {
        let document = Html::parse_document(html);
        let Ok(tile_sel) = selector(TILE) else {
            return Vec::new();
        };

        document
            .select(&tile_sel)
            .map(|tile| {
                // A tile either is the link or wraps it
                let href = tile
                    .value()
                    .attr("href")
                    .map(str::to_string)
                    .or_else(|| first_attr(tile, "a[href]", "href"));
                href.and_then(|href| resolve_href(base, &href))
            })
            .collect()
    }

    fn load_more_selector(&self) -> &str {
        LOAD_MORE
    }

    fn review_rows(&self, html: &str, kind: ReviewKind) -> Vec<ReviewFields> {
        let document = Html::parse_document(html);
        let Ok(row_sel) = selector(Self::row_selector(kind)) else {
            return Vec::new();
        };

        document
            .select(&row_sel)
            .map(|row| match kind {
                ReviewKind::Critic => Self::critic_fields(row),
                ReviewKind::Audience => Self::audience_fields(row),
            })
            .collect()
    }

    fn next_page(&self, html: &str) -> NextControl {
        let document = Html::parse_document(html);
        let Ok(next_sel) = selector(NEXT_PAGE) else {
            return NextControl::Absent;
        };

        match document.select(&next_sel).next() {
            None => NextControl::Absent,
            Some(control) => {
                let classes: Vec<&str> = control.value().classes().collect();
                if classes == ["next"] {
                    NextControl::Enabled
                } else {
                    NextControl::Disabled
                }
            }
        }
    }

    fn next_page_selector(&self) -> &str {
        NEXT_PAGE
    }

    fn consent_overlay(&self, html: &str) -> bool {
        let document = Html::parse_document(html);
        selector(CONSENT_OVERLAY)
            .map(|sel| document.select(&sel).next().is_some())
            .unwrap_or(false)
    }

    fn consent_dismiss_selector(&self) -> &str {
        CONSENT_DISMISS
    }

    fn title(&self, document: &Html) -> Option<String> {
        first_text(document.root_element(), TITLE)
    }

    fn cast(
        &self,
        document: &Html,
        detail_url: &str,
        base: &Url,
    ) -> ExtractResult<Vec<CastRecord>> {
        let metadata_sel = selector(CAST_METADATA)?;

        let cast = document
            .select(&metadata_sel)
            .filter_map(|metadata| metadata.parent().and_then(ElementRef::wrap))
            .map(|item| Self::cast_item(item, detail_url, base))
            .collect();

        Ok(cast)
    }

    fn movie(&self, document: &Html) -> ExtractResult<MovieRecord> {
        let root = document.root_element();
        let mut movie = MovieRecord::with_title(
            self.title(document)
                .unwrap_or_else(|| crate::records::NOT_AVAILABLE.to_string()),
        );

        if let Some(thumbnail) = first_attr(root, "tile-dynamic.thumbnail img[src]", "src") {
            movie.thumbnail_url = thumbnail;
        }
        if let Some(synopsis) = first_text(root, "p[data-qa='movie-info-synopsis']") {
            movie.synopsis = synopsis;
        }
        if let Some(score) = first_attr(root, "score-board#scoreboard", "audiencescore") {
            movie.audience_score = score;
        }
        if let Some(score) = first_attr(root, "score-board#scoreboard", "tomatometerscore") {
            movie.tomatometer_score = score;
        }

        let item_sel = selector(INFO_ITEM)?;
        let label_sel = selector("p b")?;
        let value_sel = selector("p span")?;

        for item in document.select(&item_sel) {
            let label = item.select(&label_sel).next().and_then(element_text);
            let value = item.select(&value_sel).next().and_then(element_text);
            let (Some(label), Some(value)) = (label, value) else {
                tracing::trace!("Skipping info item without label or value");
                continue;
            };

            match label.as_str() {
                "Rating:" => movie.rating = value,
                "Genre:" => movie.genre = split_list(&value),
                "Original Language:" => movie.language = value,
                "Director:" => movie.director = split_list(&value),
                "Producer:" => movie.producer = split_list(&value),
                "Writer:" => movie.writer = split_list(&value),
                "Release Date (Theaters):" => movie.theater_release_date = value,
                "Release Date (Streaming):" => movie.streaming_release_date = value,
                "Box Office (Gross USA):" => movie.usa_box_office_gross = value,
                "Runtime:" => movie.runtime = value,
                "Distributor:" => movie.distributor = value,
                "Production Co:" => movie.production_company = split_list(&value),
                "Sound Mix:" => movie.sound_mix = split_list(&value),
                other => tracing::trace!("Ignoring info item {}", other),
            }
        }

        Ok(movie)
    }

    fn review_entry_points(&self, document: &Html) -> ReviewEntryPoints {
        let root = document.root_element();
        ReviewEntryPoints {
            critic: first_attr(root, CRITIC_ENTRY, "href"),
            audience: first_attr(root, AUDIENCE_ENTRY, "href"),
        }
    }
}
