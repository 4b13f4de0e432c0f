//! Static keyword tables used by the rule-based scorer

/// Purchase and conversion words. Each match adds 15 points and marks
/// the keyword as transactional.
pub const HIGH_INTENT: &[&str] = &[
    "购买", "买", "价格", "多少钱", "报价", "优惠", "折扣", "促销", "团购", "秒杀",
    "免费", "试用", "下载", "注册", "开户", "申请", "订购", "预约", "咨询", "服务",
    "代理", "加盟", "招商", "合作", "牌子",
];

/// Comparison and evaluation words. Each match adds 8 points and marks
/// the keyword as commercial.
pub const MEDIUM_INTENT: &[&str] = &[
    "费用", "收费", "评价", "口碑", "推荐", "对比", "选择", "哪家好", "哪个好",
    "哪个牌子", "排行榜", "品牌", "公司", "厂家", "怎么样", "好不好", "效果",
];

/// Question and learning words. Each match adds 3 points and marks the
/// keyword as informational.
pub const INFO_INTENT: &[&str] = &[
    "什么", "怎么", "如何", "为什么", "是什么", "原理", "介绍", "教程", "方法",
    "步骤", "流程", "注意事项", "基础知识", "哪个",
];

/// Site-seeking words
pub const NAVIGATIONAL: &[&str] = &["官网", "网站", "登录", "首页", "主页", "入口"];

/// Cities and proximity words
pub const LOCATION_TERMS: &[&str] = &[
    "北京", "上海", "广州", "深圳", "杭州", "成都", "武汉", "西安",
    "附近", "本地", "当地", "周边", "市", "区", "县", "镇",
];

/// Date and unit characters that usually accompany prices, models or deadlines
pub const DATE_UNIT_CHARS: &[char] = &['年', '月', '日', '元', '万', '千', '百'];

/// Industry vocabularies, checked in order
pub const INDUSTRIES: &[(&str, &[&str])] = &[
    ("education", &["培训", "教育", "学习", "课程", "考试", "证书", "学校", "大学"]),
    ("finance", &["贷款", "投资", "理财", "保险", "银行", "股票", "基金", "信用卡"]),
    ("healthcare", &["医院", "医生", "治疗", "药", "健康", "疾病", "症状", "体检", "减肥"]),
    ("ecommerce", &["商城", "购物", "电商", "零售", "批发", "商品", "店铺", "平台"]),
    ("technology", &["软件", "系统", "技术", "开发", "程序", "AI", "数据", "云计算"]),
    ("real_estate", &["房产", "楼盘", "租房", "买房", "装修", "家具", "建材", "物业"]),
];

/// Phrases in a market data traffic reason that signal paid demand
pub const COMMERCIAL_INDICATORS: &[&str] = &[
    "购买", "价格", "多少钱", "费用", "优惠", "促销",
    "品牌", "推荐", "评测", "对比", "排行",
    "加盟", "代理", "招商", "合作",
];

/// Number of entries of `words` contained in `text`
pub fn count_matches(text: &str, words: &[&str]) -> usize {
    words.iter().filter(|w| text.contains(*w)).count()
}

pub fn contains_any(text: &str, words: &[&str]) -> bool {
    words.iter().any(|w| text.contains(w))
}

/// First industry whose vocabulary appears in `text`
pub fn industry_of(text: &str) -> Option<&'static str> {
    INDUSTRIES
        .iter()
        .find(|(_, words)| contains_any(text, words))
        .map(|(name, _)| *name)
}
