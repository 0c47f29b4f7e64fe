mod common;

use anyhow::Result;
use common::*;
use job_harvest::session::{BrowserSession, SessionFactory};
use job_harvest::testing::{CountingGeocoder, ScriptedSessionFactory, ScriptedSite};
use job_harvest::{
    CompiledSite, CrawlMode, CrawlState, PageStep, PaginationController, PaginationStrategy,
    TerminationReason,
};

fn chained_board(pages: u32) -> ScriptedSite {
    let url = |n: u32| {
        if n == 1 {
            BOARD.to_string()
        } else {
            format!("{BOARD}?p={n}")
        }
    };
    (1..=pages).fold(ScriptedSite::new(), |site, n| {
        let rows = vec![row(n, "Paris - France", "2025-05-10")];
        let next = if n < pages { "next" } else { "next disabled" };
        let site = site
            .page(url(n), listing_page(&rows, Some(next)))
            .page(detail_url(n), detail_page(n));
        if n < pages {
            site.click(url(n), "a.next", url(n + 1))
        } else {
            site
        }
    })
}

#[tokio::test]
async fn sample_mode_stops_at_page_budget() -> Result<()> {
    let h = harness(chained_board(5), CountingGeocoder::new())?;
    let pipeline = h.pipeline.clone().with_mode(CrawlMode::Sample { pages: 2 });

    let report = pipeline
        .run(&CompiledSite::compile(board_site("board"), fast_wait())?)
        .await?;

    assert_eq!(report.pages_visited, 2);
    assert_eq!(report.stored, 2);
    assert_eq!(report.termination, Some(TerminationReason::BudgetExhausted));
    assert_eq!(h.factory.log().clicks.len(), 1);
    assert!(!h.factory.log().visited(&detail_url(3)));
    Ok(())
}

#[tokio::test]
async fn full_mode_walks_until_control_is_disabled() -> Result<()> {
    let h = harness(chained_board(4), CountingGeocoder::new())?;

    let report = h
        .pipeline
        .run(&CompiledSite::compile(board_site("board"), fast_wait())?)
        .await?;

    assert_eq!(report.pages_visited, 4);
    assert_eq!(report.stored, 4);
    assert_eq!(report.termination, Some(TerminationReason::Disabled));
    Ok(())
}

#[tokio::test]
async fn disabled_control_is_never_clicked() -> Result<()> {
    let factory = ScriptedSessionFactory::new(ScriptedSite::new().page(
        BOARD,
        listing_page(&[row(1, "Paris - France", "2025-05-10")], Some("next invisible")),
    ));
    let controller = PaginationController::new(
        PaginationStrategy::next_control("a.next"),
        "ul.jobs li",
        fast_wait(),
    )?;
    let mut session = factory.open().await?;
    session.goto(BOARD).await?;
    let mut state = CrawlState::new(CrawlMode::Full);

    let step = controller.next_page(session.as_mut(), &mut state, 1).await;

    assert_eq!(step, PageStep::Terminate(TerminationReason::Disabled));
    assert!(state.is_terminal());
    assert_eq!(state.page(), 1);

    let again = controller.next_page(session.as_mut(), &mut state, 1).await;
    assert_eq!(again, PageStep::Terminate(TerminationReason::Disabled));

    let log = factory.log();
    assert!(log.clicks.is_empty());
    assert_eq!(log.visits, vec![BOARD.to_string()]);
    Ok(())
}

#[tokio::test]
async fn unchanged_content_after_click_is_a_fault() -> Result<()> {
    let factory = ScriptedSessionFactory::new(ScriptedSite::new().page(
        BOARD,
        listing_page(&[row(1, "Paris - France", "2025-05-10")], Some("next")),
    ));
    let controller = PaginationController::new(
        PaginationStrategy::next_control("a.next"),
        "ul.jobs li",
        fast_wait(),
    )?;
    let mut session = factory.open().await?;
    session.goto(BOARD).await?;
    let mut state = CrawlState::new(CrawlMode::Full);

    let step = controller.next_page(session.as_mut(), &mut state, 1).await;

    assert!(matches!(
        step,
        PageStep::Terminate(TerminationReason::Fault(_))
    ));
    assert_eq!(factory.log().clicks, vec!["a.next".to_string()]);
    Ok(())
}

#[tokio::test]
async fn page_parameter_walk_ends_on_empty_page() -> Result<()> {
    let base = "https://careers.example.com/offers";
    let factory = ScriptedSessionFactory::new(
        ScriptedSite::new()
            .page(base, listing_page(&[row(1, "Paris - France", "2025-05-10")], None))
            .page(
                format!("{base}?page=2"),
                listing_page(&[row(2, "Paris - France", "2025-05-10")], None),
            )
            .page(format!("{base}?page=3"), listing_page(&[], None)),
    );
    let controller = PaginationController::new(
        PaginationStrategy::PageParam {
            param: "page".into(),
            first_page: 1,
        },
        "ul.jobs li",
        fast_wait(),
    )?;
    let mut session = factory.open().await?;
    session.goto(base).await?;
    let mut state = CrawlState::new(CrawlMode::Full);

    assert_eq!(controller.next_page(session.as_mut(), &mut state, 1).await, PageStep::Continue);
    assert_eq!(session.current_url().await?, format!("{base}?page=2"));
    assert_eq!(controller.next_page(session.as_mut(), &mut state, 1).await, PageStep::Continue);
    assert_eq!(session.current_url().await?, format!("{base}?page=3"));
    assert_eq!(
        controller.next_page(session.as_mut(), &mut state, 0).await,
        PageStep::Terminate(TerminationReason::EmptyPage)
    );
    assert_eq!(state.page(), 3);
    Ok(())
}

#[tokio::test]
async fn navigation_failure_ends_walk_quietly() -> Result<()> {
    let base = "https://careers.example.com/offers";
    let factory = ScriptedSessionFactory::new(
        ScriptedSite::new()
            .page(base, listing_page(&[row(1, "Paris - France", "2025-05-10")], None))
            .fail(format!("{base}?page=2")),
    );
    let controller = PaginationController::new(
        PaginationStrategy::PageParam {
            param: "page".into(),
            first_page: 1,
        },
        "ul.jobs li",
        fast_wait(),
    )?;
    let mut session = factory.open().await?;
    session.goto(base).await?;
    let mut state = CrawlState::new(CrawlMode::Full);

    let step = controller.next_page(session.as_mut(), &mut state, 1).await;

    assert!(matches!(step, PageStep::Terminate(TerminationReason::Fault(_))));
    assert!(
        state
            .termination()
            .is_some_and(|reason| reason.to_string().starts_with("pagination fault"))
    );
    Ok(())
}
