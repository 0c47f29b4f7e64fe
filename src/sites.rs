//! Built-in site catalogue
//!
//! Each function returns the [`SiteSpec`] for one career site. Selectors
//! track the live markup and will drift; config `extra_sites` can override a
//! built-in by reusing its name.

use crate::extract::{DetailSelectors, FieldSelector, ListingSelectors, SplitPart};
use crate::pagination::{DEFAULT_DISABLED_MARKERS, PaginationStrategy};
use crate::site::{LocationMode, SiteSpec};

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}

/// Every built-in site, in a stable order.
#[must_use]
pub fn builtin_sites() -> Vec<SiteSpec> {
    vec![
        avl(),
        sqli(),
        capgemini(),
        capgemini_engineering(),
        akkodis(),
        scalian(),
        expleo(),
        alten_morocco(),
        apside(),
        devoteam(),
        inetum(),
        lear(),
        stellantis(),
    ]
}

/// Built-in site by name, case-insensitively.
#[must_use]
pub fn builtin_site(name: &str) -> Option<SiteSpec> {
    builtin_sites()
        .into_iter()
        .find(|site| site.name.eq_ignore_ascii_case(name.trim()))
}

#[must_use]
pub fn avl() -> SiteSpec {
    SiteSpec {
        name: "avl".into(),
        company: "AVL".into(),
        start_url: "https://jobs.avl.com/search/?createNewAlert=false&q=&locationsearch=".into(),
        sample_start_url: None,
        consent_selectors: strings(&["#cookie-accept"]),
        overlay_selectors: vec![],
        frame_selector: None,
        listing: ListingSelectors {
            item: "#searchresults tr.data-row".into(),
            title: FieldSelector::css("td.colTitle span.jobTitle"),
            link: FieldSelector::attr("td.colTitle span.jobTitle a", "href"),
            location: Some(FieldSelector::css("td.colLocation span.jobLocation")),
            country: None,
            contract_type: None,
            work_mode: None,
            publish_date: Some(FieldSelector::css("td.colDate span.jobDate")),
        },
        date_formats: strings(&["%b %d, %Y"]),
        location_mode: LocationMode::Split,
        pagination: PaginationStrategy::next_control(
            "div.pagination-well ul.pagination li.active + li a",
        ),
        detail: DetailSelectors {
            description: strings(&["span.jobdescription"]),
            apply_link: Some(FieldSelector::attr(
                "div.jobTitle div.btn-social-apply .btn-primary",
                "href",
            )),
            contract_type: Some(FieldSelector::css(
                "div.jobColumnTwo div.joblayouttoken:nth-of-type(4) div.row span:nth-child(2)",
            )),
            work_mode: None,
            publish_date: None,
            location: None,
        },
        admit_undated: true,
    }
}

#[must_use]
pub fn sqli() -> SiteSpec {
    SiteSpec {
        name: "sqli".into(),
        company: "SQLI".into(),
        start_url: "https://www.sqli.com/int-en/careers/our-jobs?f%5B0%5D=".into(),
        sample_start_url: None,
        consent_selectors: strings(&["#didomi-notice-agree-button"]),
        overlay_selectors: vec![],
        frame_selector: None,
        listing: ListingSelectors {
            item: "div.jobs-list div.jobs-list__jobs ul li".into(),
            title: FieldSelector::css("p.title-h3"),
            link: FieldSelector::attr("p.title-h3 a", "href"),
            location: Some(FieldSelector::css("dl dd:nth-child(2)")),
            country: None,
            contract_type: Some(FieldSelector::css("dl dd:nth-child(4)")),
            work_mode: None,
            publish_date: None,
        },
        date_formats: strings(&["%d/%m/%Y"]),
        location_mode: LocationMode::Split,
        pagination: PaginationStrategy::next_control(
            "div.jobs-list nav.pager ul li[class*='item--next'] a",
        ),
        detail: DetailSelectors {
            description: strings(&[
                "div.node-job-page div.node-job-page__wrapper div.node-job-page__description",
            ]),
            apply_link: Some(FieldSelector::attr("a.button-primary", "href")),
            contract_type: None,
            work_mode: None,
            publish_date: None,
            location: None,
        },
        admit_undated: true,
    }
}

#[must_use]
pub fn capgemini() -> SiteSpec {
    SiteSpec {
        name: "capgemini".into(),
        company: "Capgemini".into(),
        start_url: "https://www.capgemini.com/careers/join-capgemini/job-search/?size=1500".into(),
        sample_start_url: Some(
            "https://www.capgemini.com/careers/join-capgemini/job-search/?size=20".into(),
        ),
        consent_selectors: strings(&["#truste-consent-button"]),
        overlay_selectors: vec![],
        frame_selector: None,
        listing: ListingSelectors {
            item: "section.table.filters-content a".into(),
            title: FieldSelector::css(".table-td:nth-child(1) div"),
            link: FieldSelector::attr(":scope", "href"),
            location: Some(FieldSelector::css(".table-td:nth-child(3) div")),
            country: Some(FieldSelector::css(".table-td:nth-child(2) div")),
            contract_type: Some(FieldSelector::css(".table-td:nth-child(6) div")),
            work_mode: None,
            publish_date: None,
        },
        date_formats: strings(&["%d/%m/%Y"]),
        location_mode: LocationMode::Columns,
        pagination: PaginationStrategy::None,
        detail: DetailSelectors {
            description: strings(&["section.section--job-info div.article-text"]),
            apply_link: Some(FieldSelector::attr(
                "section.section--job-info div.job-meta-box a.cta-link",
                "href",
            )),
            contract_type: None,
            work_mode: None,
            publish_date: None,
            location: None,
        },
        admit_undated: true,
    }
}

#[must_use]
pub fn akkodis() -> SiteSpec {
    SiteSpec {
        name: "akkodis".into(),
        company: "Akkodis".into(),
        start_url: "https://www.akkodis.com/en-us/careers/job-results".into(),
        sample_start_url: None,
        consent_selectors: strings(&["#onetrust-accept-btn-handler"]),
        overlay_selectors: strings(&["#__sense-widget", "#__sense-widget-button"]),
        frame_selector: None,
        listing: ListingSelectors {
            item: "div[class*='JobSearchResults_filter-container'] > div:nth-child(3) ul[class*='JobSearchResults_filter'] li"
                .into(),
            title: FieldSelector::css("h3"),
            link: FieldSelector::attr("a", "href"),
            location: Some(FieldSelector::css(
                "a > div:nth-child(3) > div:nth-child(2) span:nth-child(2)",
            )),
            country: None,
            contract_type: Some(FieldSelector::css(
                "a > div:nth-child(3) > div:nth-child(1) span:nth-child(2)",
            )),
            work_mode: None,
            publish_date: Some(FieldSelector::css(
                "a > div:nth-child(3) > div:nth-child(3) span:nth-child(2)",
            )),
        },
        date_formats: strings(&["%d %b %Y"]),
        location_mode: LocationMode::ResolveCity,
        pagination: PaginationStrategy::NextControl {
            selector: "span[class*='pagination-right-arrow'] span".into(),
            disabled_markers: strings(DEFAULT_DISABLED_MARKERS),
            page_count_selector: Some("ul[class*='pagination_pagination-list'] li".into()),
        },
        detail: DetailSelectors {
            description: strings(&["div[class*='JobDescription_job-description-body']"]),
            apply_link: Some(FieldSelector::attr(
                "div[class*='JobDescription_mobile-job-details'] a[class*='apply-now-button']",
                "href",
            )),
            contract_type: None,
            work_mode: None,
            publish_date: None,
            location: None,
        },
        admit_undated: true,
    }
}

#[must_use]
pub fn scalian() -> SiteSpec {
    SiteSpec {
        name: "scalian".into(),
        company: "Scalian".into(),
        start_url: "https://careers.scalian.com/en/jobs?q=&options=&page=1".into(),
        sample_start_url: None,
        consent_selectors: vec![],
        overlay_selectors: strings(&["div.needsclick"]),
        frame_selector: None,
        listing: ListingSelectors {
            item: "div.attrax-list-widget__lists div.attrax-list-widget__list div.attrax-vacancy-tile"
                .into(),
            title: FieldSelector::css("a.attrax-vacancy-tile__title"),
            link: FieldSelector::attr("a.attrax-vacancy-tile__title", "href"),
            location: Some(FieldSelector::css(
                "div.attrax-vacancy-tile__location-freetext p.attrax-vacancy-tile__item-value",
            )),
            country: None,
            contract_type: Some(FieldSelector::css(
                "div.attrax-vacancy-tile__option-contract-type p.attrax-vacancy-tile__item-value",
            )),
            work_mode: None,
            publish_date: None,
        },
        date_formats: strings(&["%d/%m/%Y"]),
        location_mode: LocationMode::ResolveCity,
        pagination: PaginationStrategy::PageParam {
            param: "page".into(),
            first_page: 1,
        },
        detail: DetailSelectors {
            description: strings(&["div.description-widget"]),
            apply_link: Some(FieldSelector::attr(
                "div.job-details__details-container a.jobApplyBtn",
                "href",
            )),
            contract_type: None,
            work_mode: None,
            publish_date: None,
            location: None,
        },
        admit_undated: true,
    }
}

/// iCIMS-hosted board; listings and details live inside an iframe
#[must_use]
pub fn expleo() -> SiteSpec {
    let field_block = "div.col-xs-12.additionalFields dl.iCIMS_JobHeaderGroup";
    let labeled = |labels: &[&str]| FieldSelector::Labeled {
        labels: strings(labels),
        label_selector: format!("{field_block} dt"),
    };

    SiteSpec {
        name: "expleo".into(),
        company: "Expleo Group".into(),
        start_url: "https://expleo-jobs-fr-fr.icims.com/jobs/search?ss=1".into(),
        sample_start_url: None,
        consent_selectors: strings(&["#onetrust-accept-btn-handler"]),
        overlay_selectors: vec![],
        frame_selector: Some("iframe[name='icims_content_iframe']".into()),
        listing: ListingSelectors {
            item: "div.container-fluid.iCIMS_JobsTable div.row".into(),
            title: FieldSelector::css("div.col-xs-12.title a.iCIMS_Anchor h3"),
            link: FieldSelector::attr("div.col-xs-12.title a.iCIMS_Anchor", "href"),
            location: Some(labeled(&["job locations"])),
            country: None,
            contract_type: Some(labeled(&["type d’emploi", "type d'emploi"])),
            work_mode: Some(labeled(&["lieu de travail"])),
            publish_date: Some(FieldSelector::css(
                "div.col-xs-6.header.right > span:nth-of-type(2)",
            )),
        },
        date_formats: strings(&["%d/%m/%Y", "%m/%d/%Y"]),
        location_mode: LocationMode::ResolveCity,
        pagination: PaginationStrategy::NextControl {
            selector: "div.iCIMS_Paging.text-center span.halflings.halflings-menu-right".into(),
            disabled_markers: strings(&["invisible", "disabled"]),
            page_count_selector: None,
        },
        detail: DetailSelectors {
            description: strings(&["div.iCIMS_InfoMsg.iCIMS_InfoMsg_Job"]),
            apply_link: Some(FieldSelector::attr("a.iCIMS_ApplyOnlineButton", "href")),
            contract_type: None,
            work_mode: None,
            publish_date: None,
            location: None,
        },
        admit_undated: true,
    }
}

/// Moroccan engineering board on the Capgemini job search
#[must_use]
pub fn capgemini_engineering() -> SiteSpec {
    SiteSpec {
        name: "capgemini-engineering".into(),
        company: "Capgemini Engineering".into(),
        start_url: "https://www.capgemini.com/ma-en/job-search/?page=1&size=11&country_code=ma-en"
            .into(),
        sample_start_url: None,
        consent_selectors: strings(&["#truste-consent-button"]),
        overlay_selectors: vec![],
        frame_selector: None,
        listing: ListingSelectors {
            item: "#job-list-section ul li a".into(),
            title: FieldSelector::css("div[class*='title']"),
            link: FieldSelector::attr(":scope", "href"),
            location: Some(FieldSelector::css("div[class*='location']")),
            country: None,
            contract_type: Some(FieldSelector::css("ul li[class*='contract-type']")),
            work_mode: None,
            publish_date: None,
        },
        date_formats: strings(&["%d/%m/%Y"]),
        location_mode: LocationMode::ResolveCity,
        pagination: PaginationStrategy::next_control("button[class*='Pagination-module__next']"),
        detail: DetailSelectors {
            description: strings(&["#detail-container div[class*='SingleJobDescription']"]),
            apply_link: Some(FieldSelector::attr(
                "#sticky-header a[class*='Header-module__apply']",
                "href",
            )),
            contract_type: None,
            work_mode: None,
            publish_date: None,
            location: None,
        },
        admit_undated: true,
    }
}

/// Alten Morocco's WordPress job board
///
/// Other Alten countries are picked from a dropdown on alten.com at run
/// time; add them through `extra_sites` with these selectors.
#[must_use]
pub fn alten_morocco() -> SiteSpec {
    SiteSpec {
        name: "alten-morocco".into(),
        company: "Alten".into(),
        start_url: "https://www.alten.ma/rejoignez-nous/#rejoignez-nous".into(),
        sample_start_url: None,
        consent_selectors: strings(&["#tarteaucitronPersonalize2"]),
        overlay_selectors: strings(&["div.modal-dialog.modal-dialog-centered.modal-lg"]),
        frame_selector: None,
        listing: ListingSelectors {
            item: "#jobboard-jobboard-0 .wp-block-jobboard-loop .card-inner".into(),
            title: FieldSelector::css(".card-title"),
            link: FieldSelector::attr(".card-title", "href"),
            location: Some(FieldSelector::css(".card-location .location-list")),
            country: None,
            contract_type: None,
            work_mode: None,
            publish_date: Some(FieldSelector::css(".card-date .mx-2")),
        },
        date_formats: strings(&["%d/%m/%Y", "%Y-%m-%d"]),
        location_mode: LocationMode::ResolveCity,
        pagination: PaginationStrategy::next_control(
            "div.wp-block-jobboard-pagination nav ul.pagination li.active + li",
        ),
        detail: DetailSelectors {
            description: strings(&[".mb-5.wp-block-jobboard-offer-meta"]),
            apply_link: Some(FieldSelector::attr(
                ".mx-md-2.is-style-button-blue.wp-block-jobboard-offer-action a",
                "href",
            )),
            contract_type: None,
            work_mode: None,
            publish_date: None,
            location: None,
        },
        admit_undated: true,
    }
}

/// FacetWP board whose tag row mixes date, contract type and location
#[must_use]
pub fn apside() -> SiteSpec {
    let tags = "div.card-job-offer__content div.card-job-offer__tags > span";
    let other_tags = format!("{tags}:not(:first-child)");
    let contracts = ["temps plein", "fulltime", "cdi", "parttime", "freelance"];

    SiteSpec {
        name: "apside".into(),
        company: "Apside".into(),
        start_url: "https://www.apside.com/fr/nos-offres-emploi/".into(),
        sample_start_url: None,
        // The board only renders reliably after its first page is re-clicked.
        consent_selectors: strings(&[
            "#tarteaucitronPersonalize2",
            "span.facetwp-page.first-page.active",
        ]),
        overlay_selectors: vec![],
        frame_selector: None,
        listing: ListingSelectors {
            item: "main.main section[class*='joboffergrid'] div.bp12-joboffergrid__posts div.card-list__item"
                .into(),
            title: FieldSelector::css("div.card-job-offer__content h3.card-job-offer__title"),
            link: FieldSelector::attr("a", "href"),
            location: Some(FieldSelector::without_keywords(other_tags.as_str(), contracts)),
            country: None,
            contract_type: Some(FieldSelector::keyword(other_tags.as_str(), contracts)),
            work_mode: None,
            publish_date: Some(FieldSelector::css(format!("{tags}:first-child"))),
        },
        date_formats: strings(&["%d-%m-%Y"]),
        location_mode: LocationMode::ResolveCity,
        pagination: PaginationStrategy::next_control(
            "div.facetwp-pager span.facetwp-page.active + span.facetwp-page:not(.next)",
        ),
        detail: DetailSelectors {
            description: strings(&[
                "div[class*='jobmaindesc__text']",
                "div[class*='jobrequirements__content']",
            ]),
            apply_link: None,
            contract_type: None,
            work_mode: None,
            publish_date: None,
            location: None,
        },
        admit_undated: true,
    }
}

/// Listing headings read `"<title>, <contract type>"`; the location is only
/// on the detail page
#[must_use]
pub fn devoteam() -> SiteSpec {
    let heading = "div.wrapper a h2.title";
    let body = "div.entry-content.wp-block-post-content";

    SiteSpec {
        name: "devoteam".into(),
        company: "Devoteam".into(),
        start_url: "https://www.devoteam.com/fr/jobs/".into(),
        sample_start_url: None,
        consent_selectors: strings(&["button.button-accept-all"]),
        overlay_selectors: strings(&["#interactive-close-button-container"]),
        frame_selector: None,
        listing: ListingSelectors {
            item: "div.jobs-list div.container".into(),
            title: FieldSelector::split(heading, ",", SplitPart::Before),
            link: FieldSelector::attr("div.wrapper a", "href"),
            location: None,
            country: None,
            contract_type: Some(FieldSelector::split(heading, ",", SplitPart::After)),
            work_mode: None,
            publish_date: None,
        },
        date_formats: strings(&["%d/%m/%Y"]),
        location_mode: LocationMode::ResolveCity,
        // The last pager link only carries `active` while a next page exists.
        pagination: PaginationStrategy::next_control("div.pagination-wrapper a.active:last-child"),
        detail: DetailSelectors {
            description: vec![format!("{body} div.description")],
            apply_link: Some(FieldSelector::attr(format!("{body} div.wp-block-buttons a"), "href")),
            contract_type: None,
            work_mode: None,
            publish_date: None,
            location: Some(FieldSelector::css(
                "div.wp-block-acf-post-header div.wp-block-group p",
            )),
        },
        admit_undated: true,
    }
}

#[must_use]
pub fn inetum() -> SiteSpec {
    SiteSpec {
        name: "inetum".into(),
        company: "Inetum".into(),
        start_url: "https://www.inetum.com/en/jobs".into(),
        sample_start_url: None,
        consent_selectors: strings(&[
            "div.modal-content button.btn--primary",
            "button.agree-button.eu-cookie-compliance-default-button",
        ]),
        overlay_selectors: vec![],
        frame_selector: None,
        listing: ListingSelectors {
            item: "div.container section.region--content div.views-view-grid div.card-body".into(),
            title: FieldSelector::css("h3"),
            link: FieldSelector::attr("a", "href"),
            location: Some(FieldSelector::css("p.card-text")),
            country: None,
            contract_type: Some(FieldSelector::css("p.card-subtitle")),
            work_mode: None,
            publish_date: None,
        },
        date_formats: strings(&["%d/%m/%Y"]),
        location_mode: LocationMode::ResolveCity,
        pagination: PaginationStrategy::next_control(
            "ul.pagination li:nth-last-child(2) i[class*='forward']",
        ),
        detail: DetailSelectors {
            description: strings(&["div.container div.col-md-7"]),
            apply_link: Some(FieldSelector::attr("div.container a.btn.btn-accent", "href")),
            contract_type: None,
            work_mode: None,
            publish_date: None,
            location: None,
        },
        admit_undated: true,
    }
}

/// SuccessFactors board like AVL's; the location is read on the detail page
#[must_use]
pub fn lear() -> SiteSpec {
    let token = |n: u32| format!("div.content div.job div.joblayouttoken:nth-of-type({n}) div.row");

    SiteSpec {
        name: "lear".into(),
        company: "LEAR".into(),
        start_url: "https://jobs.lear.com/search/".into(),
        sample_start_url: None,
        consent_selectors: strings(&["#cookie-accept"]),
        overlay_selectors: vec![],
        frame_selector: None,
        listing: ListingSelectors {
            item: "#searchresults tr.data-row".into(),
            title: FieldSelector::css("td.colTitle span.jobTitle"),
            link: FieldSelector::attr("td.colTitle span.jobTitle a", "href"),
            location: None,
            country: None,
            contract_type: None,
            work_mode: None,
            publish_date: None,
        },
        date_formats: strings(&["%d/%m/%Y"]),
        location_mode: LocationMode::Split,
        pagination: PaginationStrategy::next_control(
            "div.pagination-well ul.pagination li.active + li a",
        ),
        detail: DetailSelectors {
            description: vec![token(7)],
            apply_link: Some(FieldSelector::attr("div.applylink a.btn-primary", "href")),
            contract_type: None,
            work_mode: None,
            publish_date: None,
            location: Some(FieldSelector::css(format!("{} span:nth-child(2)", token(3)))),
        },
        admit_undated: true,
    }
}

/// Publish dates live on the detail page; the consent banner sits in its
/// own iframe and is hidden rather than clicked
#[must_use]
pub fn stellantis() -> SiteSpec {
    let pager = "#widget-jobsearch-results-pages ul li";

    SiteSpec {
        name: "stellantis".into(),
        company: "Stellantis".into(),
        start_url: "https://careers.stellantis.com/job-search-results/".into(),
        sample_start_url: None,
        consent_selectors: vec![],
        overlay_selectors: strings(&["iframe#iFrame1", "iframe[name='iFrame1']"]),
        frame_selector: None,
        listing: ListingSelectors {
            item: "#widget-jobsearch-results-list ol > li".into(),
            title: FieldSelector::css("li.title div.jobTitle a"),
            link: FieldSelector::attr("li.title div.jobTitle a", "href"),
            location: Some(FieldSelector::css(
                "li.city_state_or_locationtype div[class*='location']",
            )),
            country: None,
            contract_type: None,
            work_mode: None,
            publish_date: None,
        },
        date_formats: strings(&["%B %d, %Y"]),
        location_mode: LocationMode::ResolveCity,
        pagination: PaginationStrategy::NextControl {
            selector: format!("{pager}:nth-last-child(2)"),
            disabled_markers: strings(DEFAULT_DISABLED_MARKERS),
            page_count_selector: Some(pager.into()),
        },
        detail: DetailSelectors {
            description: strings(&["div.tabcontainer"]),
            apply_link: Some(FieldSelector::attr("#gtm-jobdetail-apply a", "href")),
            contract_type: None,
            work_mode: None,
            publish_date: Some(FieldSelector::css("#gtm-jobdetail-date")),
            location: None,
        },
        admit_undated: true,
    }
}
