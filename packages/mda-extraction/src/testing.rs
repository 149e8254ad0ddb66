//! Shared fixtures for unit and integration tests: a small synthetic
//! annual report with a TOC, an MD&A chapter, and a following section.

use crate::types::{PageBreakKind, PageSet};

/// One page of MD&A-flavored body text.
///
/// Contains all default scoring keywords, no dotted leaders, and no line
/// that could be mistaken for a chapter heading. `printed > 0` appends a
/// printed page-number footer.
pub fn mda_body_page(printed: u32) -> String {
    let body = "报告期内，公司围绕主营业务持续深耕，实现营业收入稳步增长，同比上升百分之十二点五，核心产品线收入占比进一步提升。\n\
报告期内毛利率保持在较高水平，同比改善明显，经营活动产生的现金流净额充裕，为后续投入提供了稳定保障。\n\
从行业层面看，下游需求逐步回暖，行业集中度持续提升，公司市场份额稳中有升，品牌影响力不断增强。\n\
展望未来，公司将继续聚焦主营业务，优化产品结构，强化成本管控，提升盈利能力，同时加大研发投入，推进数字化转型，巩固行业领先地位。";
    if printed == 0 {
        body.to_string()
    } else {
        format!("{body}\n第 {printed} 页")
    }
}

/// A minimal but realistic report: TOC page, front matter, an MD&A
/// chapter spanning several pages, and a supervisory-board section that
/// closes it.
pub fn sample_report() -> PageSet {
    let toc = "目 录\n\
第一节 重要提示……1\n\
第二节 公司简介……3\n\
第三节 会计数据……5\n\
第四节 管理层讨论与分析……7\n\
第五节 监事会报告……15\n\
第六节 公司治理……18";

    let front_matter = "第一节 重要提示\n\
本公司全体成员保证年度报告内容的真实性、准确性和完整性，不存在虚假记载、误导性陈述或者重大遗漏。";

    let company_profile = "第二节 公司简介\n\
公司注册地址位于上海市浦东新区，经营范围涵盖智能制造与信息服务。";

    let mut pages = vec![
        toc.to_string(),
        front_matter.to_string(),
        company_profile.to_string(),
        format!("第四节 管理层讨论与分析\n{}", mda_body_page(0)),
    ];
    for _ in 0..4 {
        pages.push(mda_body_page(0));
    }
    pages.push(
        "第五节 监事会报告\n监事会全体成员对报告期内公司的财务状况及关联交易进行了核查。"
            .to_string(),
    );

    PageSet::new(pages, PageBreakKind::FormFeed)
}
