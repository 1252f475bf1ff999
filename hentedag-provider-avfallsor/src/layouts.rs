//! Extraction strategies for the page layouts Avfall Sør has served over time.
//!
//! Strategies are tried in the order returned by [`default_strategies`]: the reminder form
//! layout, the pickup-days layout, then the legacy list announcing a weekly pickup day.

use std::sync::Arc;

use chrono::{Datelike, NaiveDate, Weekday};
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};

use hentedag_core::{
    extract::{Extraction, ExtractionStrategy},
    locale::{DateParser, ParseError},
    model::{CategoryMap, CategoryRule, ExceptionPair, Schedule, WasteCategory},
};

const ISO_DATE_FORMAT: &str = "%Y-%m-%d";

/// Form-based layout: one `<form>` per pickup carrying the category label and ISO date.
///
/// ```html
/// <form class="pickup-reminder">
///   <input type="hidden" name="fraction" value="Restavfall">
///   <input type="hidden" name="date" value="2025-03-12">
/// </form>
/// ```
pub struct FormLayout {
    labels: CategoryMap,
}

impl FormLayout {
    /// Create the layout with a label map.
    #[must_use]
    pub fn new(labels: CategoryMap) -> Self {
        Self { labels }
    }
}

impl ExtractionStrategy for FormLayout {
    fn name(&self) -> &'static str {
        "form"
    }

    fn try_extract(&self, document: &str, _today: NaiveDate) -> Option<Extraction> {
        let html = Html::parse_document(document);
        let block_sel = Selector::parse("form").ok()?;
        let label_sel = Selector::parse("input[name='fraction']").ok()?;
        let date_sel = Selector::parse("input[name='date']").ok()?;

        let mut schedule = Schedule::new();
        for block in html.select(&block_sel) {
            let label = block
                .select(&label_sel)
                .next()
                .and_then(|input| input.value().attr("value"));
            let raw_date = block
                .select(&date_sel)
                .next()
                .and_then(|input| input.value().attr("value"));
            let (Some(label), Some(raw_date)) = (label, raw_date) else {
                continue;
            };

            let categories = self.labels.lookup(label);
            if categories.is_empty() {
                debug!(label, "Skipping unknown category label");
                continue;
            }
            // Tolerate a time part after the date.
            let iso = raw_date.trim().get(..10).unwrap_or(raw_date);
            match NaiveDate::parse_from_str(iso, ISO_DATE_FORMAT) {
                Ok(date) => schedule.insert_fan_out(categories, date),
                Err(err) => warn!(label, raw_date, error = %err, "Skipping pickup with bad date"),
            }
        }

        Some(Extraction::from_schedule(schedule))
    }
}

/// Pickup-days layout: `div.pickup-days-large` with `h3` date headings, each followed by a
/// `div` of `span.waste-icon--<fraction>` icons collected on that day.
pub struct PickupDaysLayout {
    parser: DateParser,
    icons: CategoryMap,
}

impl PickupDaysLayout {
    /// Create the layout with a date parser and an icon class map.
    #[must_use]
    pub fn new(parser: DateParser, icons: CategoryMap) -> Self {
        Self { parser, icons }
    }
}

impl ExtractionStrategy for PickupDaysLayout {
    fn name(&self) -> &'static str {
        "pickup-days"
    }

    fn try_extract(&self, document: &str, today: NaiveDate) -> Option<Extraction> {
        let html = Html::parse_document(document);
        let container_sel = Selector::parse("div.pickup-days-large").ok()?;
        let icon_sel = Selector::parse(".waste-icon").ok()?;
        let container = html.select(&container_sel).next()?;

        let mut schedule = Schedule::new();
        let mut current_date = None;
        for child in container.children().filter_map(ElementRef::wrap) {
            match child.value().name() {
                "h3" => {
                    let heading = element_text(child);
                    current_date = match self.parser.parse(&heading, None, today) {
                        Ok(date) => Some(date),
                        Err(err) => {
                            warn!(heading, error = %err, "Skipping pickup day with bad date");
                            None
                        }
                    };
                }
                "div" => {
                    let Some(date) = current_date else {
                        continue;
                    };
                    for icon in child.select(&icon_sel) {
                        for fragment in icon
                            .value()
                            .classes()
                            .filter_map(|class| class.split_once("--"))
                            .map(|(_block, fragment)| fragment)
                        {
                            schedule.insert_fan_out(self.icons.lookup(fragment), date);
                        }
                    }
                }
                _ => {}
            }
        }

        Some(Extraction::from_schedule(schedule))
    }
}

/// Legacy list layout: "Din tømmedag er: Fredag" plus `ul.tmk > li` entries.
///
/// The announced weekday produces a full-year baseline for the weekday-driven categories.
/// Entries are recognized by their image: the `alt` text names listed categories, while
/// entries containing the moved marker ("12. mar tømmes 13. mar") carry exceptions whose
/// category is read from the image `src`.
pub struct LegacyListLayout {
    parser: DateParser,
    listed: CategoryMap,
    exceptions: CategoryMap,
    weekday_driven: Vec<WasteCategory>,
    announcement: String,
    moved_marker: String,
}

impl LegacyListLayout {
    /// Create the layout with Avfall Sør's Norwegian markers.
    #[must_use]
    pub fn new(
        parser: DateParser,
        listed: CategoryMap,
        exceptions: CategoryMap,
        weekday_driven: Vec<WasteCategory>,
    ) -> Self {
        Self {
            parser,
            listed,
            exceptions,
            weekday_driven,
            announcement: "din tømmedag er".to_owned(),
            moved_marker: "tømmes".to_owned(),
        }
    }

    fn announced_weekday(&self, text: &str) -> Option<Weekday> {
        let lower = text.to_lowercase();
        let (_before, rest) = lower.split_once(self.announcement.as_str())?;
        let name = rest
            .trim_start_matches(|ch: char| ch == ':' || ch.is_whitespace())
            .split_whitespace()
            .next()?;
        self.parser.locale().weekday(name)
    }

    // "31. des tømmes 2. jan" moves into the next year.
    fn nearest_date(
        &self,
        text: &str,
        anchor: NaiveDate,
        today: NaiveDate,
    ) -> Result<NaiveDate, ParseError> {
        let same_year = self.parser.parse(text, Some(anchor.year()), today);
        [anchor.year() - 1, anchor.year() + 1]
            .into_iter()
            .filter_map(|year| self.parser.parse(text, Some(year), today).ok())
            .chain(same_year.clone().ok())
            .min_by_key(|date| date.signed_duration_since(anchor).num_days().abs())
            .map_or(same_year, Ok)
    }

    fn exception_pairs(
        &self,
        entry: ElementRef<'_>,
        text: &str,
        today: NaiveDate,
        img_sel: &Selector,
    ) -> Vec<ExceptionPair> {
        let lower = text.to_lowercase();
        let Some((original, replacement)) = lower.split_once(self.moved_marker.as_str()) else {
            return Vec::new();
        };
        // The original date belongs to the baseline year; the replacement sits next to it.
        let dates = self
            .parser
            .parse(original, Some(today.year()), today)
            .and_then(|original| Ok((original, self.nearest_date(replacement, original, today)?)));
        let (original, replacement) = match dates {
            Ok(dates) => dates,
            Err(err) => {
                warn!(text, error = %err, "Skipping pickup exception with bad date");
                return Vec::new();
            }
        };

        entry
            .select(img_sel)
            .filter_map(|img| img.value().attr("src"))
            .flat_map(|src| self.exceptions.lookup(src))
            .map(|category| ExceptionPair {
                category: category.clone(),
                original,
                replacement,
            })
            .collect()
    }
}

impl ExtractionStrategy for LegacyListLayout {
    fn name(&self) -> &'static str {
        "legacy-list"
    }

    fn try_extract(&self, document: &str, today: NaiveDate) -> Option<Extraction> {
        let html = Html::parse_document(document);
        let weekday = self.announced_weekday(&element_text(html.root_element()))?;
        let entry_sel = Selector::parse("ul.tmk > li").ok()?;
        let img_sel = Selector::parse("img").ok()?;

        let mut schedule = Schedule::new();
        schedule.pickup_weekday = Some(weekday);
        for date in weekdays_of_year(today.year(), weekday) {
            schedule.insert_fan_out(&self.weekday_driven, date);
        }

        let mut exceptions = Vec::new();
        for entry in html.select(&entry_sel) {
            let text = element_text(entry);
            if text.to_lowercase().contains(self.moved_marker.as_str()) {
                exceptions.extend(self.exception_pairs(entry, &text, today, &img_sel));
                continue;
            }

            let Some(categories) = entry
                .select(&img_sel)
                .filter_map(|img| img.value().attr("alt"))
                .map(|alt| self.listed.lookup(alt))
                .find(|categories| !categories.is_empty())
            else {
                debug!(text, "Skipping entry without known category");
                continue;
            };
            match self.parser.parse_range_start(&text, today) {
                Ok(date) => schedule.insert_fan_out(categories, date),
                Err(err) => warn!(text, error = %err, "Skipping pickup with bad date"),
            }
        }

        Some(Extraction {
            schedule,
            exceptions,
        })
    }
}

/// Every date in `year` falling on `weekday`.
#[must_use]
pub fn weekdays_of_year(year: i32, weekday: Weekday) -> Vec<NaiveDate> {
    let Some(first) = NaiveDate::from_weekday_of_month_opt(year, 1, weekday, 1) else {
        return Vec::new();
    };
    first
        .iter_weeks()
        .take_while(|date| date.year() == year)
        .collect()
}

/// Labels used by the form layout.
#[must_use]
pub fn form_labels() -> CategoryMap {
    CategoryMap::new(vec![
        CategoryRule::new("papp, papir og plast", &["paper", "plastic"]),
        CategoryRule::new("restavfall", &["residual"]),
        CategoryRule::new("matavfall", &["bio"]),
        CategoryRule::new("bioavfall", &["bio"]),
        CategoryRule::new("papp og papir", &["paper"]),
        CategoryRule::new("plastemballasje", &["plastic"]),
        CategoryRule::new("glass- og metallemballasje", &["glass", "metal"]),
    ])
}

/// Icon class fragments used by the pickup-days layout.
#[must_use]
pub fn icon_classes() -> CategoryMap {
    CategoryMap::new(vec![
        CategoryRule::new("rest", &["residual"]),
        CategoryRule::new("bio", &["bio"]),
        CategoryRule::new("mat", &["bio"]),
        CategoryRule::new("papir-plast", &["paper", "plastic"]),
        CategoryRule::new("paper", &["paper"]),
        CategoryRule::new("papir", &["paper"]),
        CategoryRule::new("plast", &["plastic"]),
        CategoryRule::new("glass", &["glass", "metal"]),
        CategoryRule::new("metal", &["glass", "metal"]),
    ])
}

/// Image `alt` fragments of explicitly listed legacy entries.
#[must_use]
pub fn listed_markers() -> CategoryMap {
    CategoryMap::new(vec![
        CategoryRule::new("grønn", &["paper"]),
        CategoryRule::new("glass", &["glass", "metal"]),
    ])
}

/// Image `src` fragments of legacy exception entries.
#[must_use]
pub fn exception_markers() -> CategoryMap {
    CategoryMap::new(vec![
        CategoryRule::new("bio", &["bio"]),
        CategoryRule::new("rest", &["residual"]),
    ])
}

/// Categories collected every week on the announced weekday.
#[must_use]
pub fn weekday_driven_categories() -> Vec<WasteCategory> {
    vec![WasteCategory::from("bio"), WasteCategory::from("residual")]
}

/// All layouts in detection order, consulting `overrides` before the built-in maps.
#[must_use]
pub fn default_strategies(overrides: &[CategoryRule]) -> Vec<Arc<dyn ExtractionStrategy>> {
    vec![
        Arc::new(FormLayout::new(form_labels().with_overrides(overrides))),
        Arc::new(PickupDaysLayout::new(
            DateParser::default(),
            icon_classes().with_overrides(overrides),
        )),
        Arc::new(LegacyListLayout::new(
            DateParser::default(),
            listed_markers().with_overrides(overrides),
            exception_markers().with_overrides(overrides),
            weekday_driven_categories(),
        )),
    ]
}

fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use hentedag_core::{extract::CalendarExtractor, query::next_pickup};

    use super::*;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
    }

    fn dates(schedule: &Schedule, category: &str) -> Vec<NaiveDate> {
        schedule
            .dates(&WasteCategory::from(category))
            .into_iter()
            .flatten()
            .copied()
            .collect()
    }

    fn form_document(records: &[(&str, &str)]) -> String {
        let forms: String = records
            .iter()
            .map(|(label, date)| {
                format!(
                    r#"<form class="pickup-reminder" method="post">
                         <input type="hidden" name="fraction" value="{label}">
                         <input type="hidden" name="date" value="{date}">
                         <button type="submit">Påminnelse</button>
                       </form>"#
                )
            })
            .collect();
        format!(
            r#"<html><body><form class="search"><input name="s"></form>{forms}</body></html>"#
        )
    }

    const LEGACY_PAGE: &str = r#"
        <html><body>
          <div class="tommekalender">
            <p>Din tømmedag er: Fredag</p>
            <ul class="tmk">
              <li><img src="/img/Papir.png" alt="grønn dunk"> Onsdag 19. mar</li>
              <li><img src="/img/Glass.png" alt="glass og metall"> Mandag 5. mai</li>
              <li><img src="/img/Bio.png" alt="brun dunk"> Fredag 18. apr tømmes Lørdag 19. apr</li>
              <li><img src="/img/Rest.png" alt="grå dunk"> Fredag 26. des tømmes Lørdag 27. des</li>
              <li><img src="/img/Papir.png" alt="grønn dunk"> ukjent dato</li>
            </ul>
          </div>
        </body></html>"#;

    const PICKUP_DAYS_PAGE: &str = r#"
        <html><body>
          <div class="pickup-days-large">
            <h3>Fredag 14. mar</h3>
            <div class="pickup-day">
              <span class="waste-icon waste-icon--rest"></span>
              <span class="waste-icon waste-icon--bio"></span>
            </div>
            <h3>Onsdag 19. Mar</h3>
            <div class="pickup-day">
              <span class="waste-icon waste-icon--paper"></span>
            </div>
            <h3>Ingen dato</h3>
            <div class="pickup-day">
              <span class="waste-icon waste-icon--metal"></span>
            </div>
          </div>
        </body></html>"#;

    #[test]
    fn form_layout_reads_label_and_iso_date() {
        let document = form_document(&[("Restavfall", "2025-03-12"), ("Papp og papir", "2025-03-19")]);
        let extraction = FormLayout::new(form_labels())
            .try_extract(&document, date(2025, 3, 1))
            .expect("form layout matches");

        let schedule = extraction.schedule;
        assert_eq!(
            schedule.categories().map(WasteCategory::as_str).collect::<Vec<_>>(),
            vec!["paper", "residual"]
        );
        assert_eq!(dates(&schedule, "residual"), vec![date(2025, 3, 12)]);
        assert_eq!(dates(&schedule, "paper"), vec![date(2025, 3, 19)]);
        assert!(extraction.exceptions.is_empty());
    }

    #[test]
    fn form_layout_fans_out_combined_labels() {
        let document = form_document(&[
            ("Papp, papir og plast", "2025-03-19T00:00:00"),
            ("Hageavfall", "2025-03-20"),
            ("Restavfall", "12.03.2025"),
        ]);
        let schedule = FormLayout::new(form_labels())
            .try_extract(&document, date(2025, 3, 1))
            .expect("form layout matches")
            .schedule;

        assert_eq!(dates(&schedule, "paper"), vec![date(2025, 3, 19)]);
        assert_eq!(dates(&schedule, "plastic"), vec![date(2025, 3, 19)]);
        assert!(dates(&schedule, "residual").is_empty(), "bad date skipped");
    }

    #[test]
    fn pickup_days_layout_reads_icons_under_headings() {
        let schedule = PickupDaysLayout::new(DateParser::default(), icon_classes())
            .try_extract(PICKUP_DAYS_PAGE, date(2025, 3, 10))
            .expect("pickup days layout matches")
            .schedule;

        assert_eq!(dates(&schedule, "residual"), vec![date(2025, 3, 14)]);
        assert_eq!(dates(&schedule, "bio"), vec![date(2025, 3, 14)]);
        assert_eq!(dates(&schedule, "paper"), vec![date(2025, 3, 19)]);
        assert!(dates(&schedule, "metal").is_empty(), "entry under bad heading skipped");
        assert_eq!(schedule.pickup_weekday, None);
    }

    #[test]
    fn pickup_days_headings_in_the_past_belong_to_next_year() {
        let schedule = PickupDaysLayout::new(DateParser::default(), icon_classes())
            .try_extract(PICKUP_DAYS_PAGE, date(2025, 3, 17))
            .expect("pickup days layout matches")
            .schedule;

        assert_eq!(dates(&schedule, "residual"), vec![date(2026, 3, 14)]);
        assert_eq!(dates(&schedule, "paper"), vec![date(2025, 3, 19)]);
    }

    #[test]
    fn legacy_layout_generates_weekday_baseline() {
        let page = r#"<html><body><p>Din tømmedag er: Fredag</p><ul class="tmk"></ul></body></html>"#;
        let today = date(2025, 3, 10);
        let extraction = LegacyListLayout::new(
            DateParser::default(),
            listed_markers(),
            exception_markers(),
            weekday_driven_categories(),
        )
        .try_extract(page, today)
        .expect("legacy layout matches");

        let fridays = weekdays_of_year(2025, Weekday::Fri);
        assert_eq!(fridays.len(), 52);
        assert_eq!(fridays.first(), Some(&date(2025, 1, 3)));
        assert_eq!(fridays.last(), Some(&date(2025, 12, 26)));

        let schedule = extraction.schedule;
        assert_eq!(schedule.pickup_weekday, Some(Weekday::Fri));
        assert_eq!(dates(&schedule, "bio"), fridays);
        assert_eq!(dates(&schedule, "residual"), fridays);
        assert_eq!(
            next_pickup(&schedule, &WasteCategory::from("bio"), today),
            Some(date(2025, 3, 14))
        );
    }

    #[test]
    fn legacy_layout_lists_entries_and_collects_exceptions() {
        let today = date(2025, 3, 10);
        let extraction = LegacyListLayout::new(
            DateParser::default(),
            listed_markers(),
            exception_markers(),
            weekday_driven_categories(),
        )
        .try_extract(LEGACY_PAGE, today)
        .expect("legacy layout matches");

        let schedule = &extraction.schedule;
        assert_eq!(dates(schedule, "paper"), vec![date(2025, 3, 19)]);
        assert_eq!(dates(schedule, "metal"), vec![date(2025, 5, 5)]);
        assert_eq!(dates(schedule, "glass"), vec![date(2025, 5, 5)]);
        assert_eq!(
            extraction.exceptions,
            vec![
                ExceptionPair {
                    category: WasteCategory::from("bio"),
                    original: date(2025, 4, 18),
                    replacement: date(2025, 4, 19),
                },
                ExceptionPair {
                    category: WasteCategory::from("residual"),
                    original: date(2025, 12, 26),
                    replacement: date(2025, 12, 27),
                },
            ]
        );
    }

    #[test]
    fn default_chain_reconciles_legacy_exceptions() {
        let extractor = CalendarExtractor::new(default_strategies(&[]));
        let schedule = extractor
            .extract(LEGACY_PAGE, date(2025, 3, 10))
            .expect("legacy page extracts");

        let bio = dates(&schedule, "bio");
        assert!(!bio.contains(&date(2025, 4, 18)), "good friday moved");
        assert!(bio.contains(&date(2025, 4, 19)));
        assert!(dates(&schedule, "residual").contains(&date(2025, 4, 18)));
        assert!(dates(&schedule, "residual").contains(&date(2025, 12, 27)));
        assert!(!dates(&schedule, "residual").contains(&date(2025, 12, 26)));
    }

    fn legacy_page(entries: &str) -> String {
        format!(
            r#"<html><body><p>Din tømmedag er: Fredag</p><ul class="tmk">{entries}</ul></body></html>"#
        )
    }

    #[test]
    fn moved_pickup_on_today_is_kept() {
        let page = legacy_page(
            r#"<li><img src="/img/Bio.png" alt="brun dunk"> Fredag 18. apr tømmes Lørdag 19. apr</li>"#,
        );
        let today = date(2025, 4, 19);
        let schedule = CalendarExtractor::new(default_strategies(&[]))
            .extract(&page, today)
            .expect("legacy page extracts");

        assert_eq!(
            next_pickup(&schedule, &WasteCategory::from("bio"), today),
            Some(date(2025, 4, 19))
        );
    }

    #[test]
    fn moved_pickup_to_yesterday_stays_in_the_same_year() {
        let page = legacy_page(
            r#"<li><img src="/img/Rest.png" alt="grå dunk"> Fredag 25. apr tømmes Torsdag 24. apr</li>"#,
        );
        let schedule = CalendarExtractor::new(default_strategies(&[]))
            .extract(&page, date(2025, 4, 25))
            .expect("legacy page extracts");

        let residual = dates(&schedule, "residual");
        assert!(residual.contains(&date(2025, 4, 24)));
        assert!(!residual.contains(&date(2025, 4, 25)));
        assert!(!residual.contains(&date(2026, 4, 24)), "no date leaks into next year");
    }

    #[test]
    fn moved_pickup_may_cross_new_year() {
        let page = legacy_page(
            r#"<li><img src="/img/Bio.png" alt="brun dunk"> Fredag 26. des tømmes Fredag 2. jan</li>"#,
        );
        let extraction = LegacyListLayout::new(
            DateParser::default(),
            listed_markers(),
            exception_markers(),
            weekday_driven_categories(),
        )
        .try_extract(&page, date(2025, 3, 10))
        .expect("legacy layout matches");

        assert_eq!(
            extraction.exceptions,
            vec![ExceptionPair {
                category: WasteCategory::from("bio"),
                original: date(2025, 12, 26),
                replacement: date(2026, 1, 2),
            }]
        );
    }

    #[test]
    fn combined_icon_fans_out_to_paper_and_plastic() {
        let page = r#"
            <div class="pickup-days-large">
              <h3>Onsdag 19. mar</h3>
              <div><span class="waste-icon waste-icon--papp-papir-plast"></span></div>
            </div>"#;
        let schedule = PickupDaysLayout::new(DateParser::default(), icon_classes())
            .try_extract(page, date(2025, 3, 10))
            .expect("pickup days layout matches")
            .schedule;

        assert_eq!(dates(&schedule, "paper"), vec![date(2025, 3, 19)]);
        assert_eq!(dates(&schedule, "plastic"), vec![date(2025, 3, 19)]);
    }

    #[test]
    fn default_chain_prefers_form_layout() {
        let extractor = CalendarExtractor::new(default_strategies(&[]));
        let document = form_document(&[("Matavfall", "2025-03-13")]);
        let schedule = extractor
            .extract(&document, date(2025, 3, 10))
            .expect("form page extracts");

        assert_eq!(dates(&schedule, "bio"), vec![date(2025, 3, 13)]);
        assert_eq!(schedule.pickup_weekday, None);
    }

    #[test]
    fn overrides_rename_categories() {
        let overrides = [CategoryRule::new("restavfall", &["mixed"])];
        let extractor = CalendarExtractor::new(default_strategies(&overrides));
        let document = form_document(&[("Restavfall", "2025-03-12")]);
        let schedule = extractor
            .extract(&document, date(2025, 3, 10))
            .expect("form page extracts");

        assert_eq!(dates(&schedule, "mixed"), vec![date(2025, 3, 12)]);
        assert!(dates(&schedule, "residual").is_empty());
    }

    #[test]
    fn unknown_page_is_unrecognized() {
        let extractor = CalendarExtractor::new(default_strategies(&[]));

        assert!(
            extractor
                .extract("<html><body><p>Fant ingen adresse</p></body></html>", date(2025, 3, 10))
                .is_err()
        );
    }
}
