//! The static product catalog used for recommendations.
//!
//! The catalog is an immutable value constructed once at process start and
//! carried in the application state; nothing mutates it afterwards, so it
//! can be shared across requests without locking.

use serde::Serialize;

/// A product that can be recommended to a user.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Product {
    /// A stable ID within the catalog. Synthesized padding entries are
    /// assigned IDs of 1000 and above to avoid colliding with these.
    pub id: i64,
    /// The display name.
    pub name: String,
    /// A one-sentence pitch for why the product saves money.
    pub description: String,
    /// The price in dollars; zero for sign-up offers.
    pub price: f64,
    /// A URL for the product image.
    pub image: String,
    /// The outbound link for the product.
    pub url: String,
}

impl Product {
    fn new(id: i64, name: &str, description: &str, price: f64, image: &str, url: &str) -> Self {
        Self {
            id,
            name: name.to_owned(),
            description: description.to_owned(),
            price,
            image: image.to_owned(),
            url: url.to_owned(),
        }
    }
}

/// Products grouped by spending-category keys, plus a `default` bucket
/// used when a category has no dedicated bucket.
#[derive(Debug, Clone)]
pub struct ProductCatalog {
    buckets: Vec<(String, Vec<Product>)>,
    default_bucket: Vec<Product>,
}

impl ProductCatalog {
    /// The built-in catalog.
    pub fn builtin() -> Self {
        let food = vec![
            Product::new(
                1,
                "Meal Prep Containers Set",
                "BPA-free glass containers perfect for meal prepping and saving money on food expenses.",
                24.99,
                "https://images.unsplash.com/photo-1556910096-6f5e72db6803?w=400&h=300&fit=crop",
                "https://www.amazon.com/s?k=meal+prep+containers",
            ),
            Product::new(
                2,
                "Air Fryer",
                "Cook healthier meals with less oil. Save on dining out with restaurant-quality food at home.",
                89.99,
                "https://images.unsplash.com/photo-1556911220-bff31c812dba?w=400&h=300&fit=crop",
                "https://www.amazon.com/s?k=air+fryer",
            ),
            Product::new(
                3,
                "Coffee Maker",
                "Brew your own coffee and save hundreds per year compared to buying daily coffee.",
                49.99,
                "https://images.unsplash.com/photo-1517668808823-d6c8b0e3b2e3?w=400&h=300&fit=crop",
                "https://www.amazon.com/s?k=coffee+maker",
            ),
        ];

        let travel = vec![
            Product::new(
                4,
                "Travel Credit Card",
                "Earn points and miles on every purchase. Perfect for frequent travelers.",
                0.0,
                "https://images.unsplash.com/photo-1553729459-efe14ef6055d?w=400&h=300&fit=crop",
                "https://www.creditcards.com/travel/",
            ),
            Product::new(
                5,
                "Luggage Set",
                "Durable, lightweight luggage that will last for years of travel adventures.",
                129.99,
                "https://images.unsplash.com/photo-1540979388789-6cee28a1cdc9?w=400&h=300&fit=crop",
                "https://www.amazon.com/s?k=luggage+set",
            ),
            Product::new(
                6,
                "Travel Insurance",
                "Protect your travel investments with comprehensive coverage at affordable rates.",
                29.99,
                "https://images.unsplash.com/photo-1488646953014-85cb44e25828?w=400&h=300&fit=crop",
                "https://www.travelinsurance.com/",
            ),
        ];

        let rent = vec![
            Product::new(
                7,
                "Smart Thermostat",
                "Save up to 23% on heating and cooling costs with intelligent temperature control.",
                199.99,
                "https://images.unsplash.com/photo-1558618666-fcd25c85cd64?w=400&h=300&fit=crop",
                "https://www.amazon.com/s?k=smart+thermostat",
            ),
            Product::new(
                8,
                "LED Light Bulbs",
                "Energy-efficient bulbs that use 75% less energy and last 25x longer.",
                19.99,
                "https://images.unsplash.com/photo-1507003211169-0a1dd7228f2d?w=400&h=300&fit=crop",
                "https://www.amazon.com/s?k=led+light+bulbs",
            ),
            Product::new(
                9,
                "Programmable Timer",
                "Automate your appliances to save energy and reduce utility bills.",
                12.99,
                "https://images.unsplash.com/photo-1581092160562-40aa08e78837?w=400&h=300&fit=crop",
                "https://www.amazon.com/s?k=programmable+timer",
            ),
        ];

        let groceries = vec![
            Product::new(
                10,
                "Grocery Delivery Service",
                "Save time and money with discounted grocery delivery subscriptions.",
                9.99,
                "https://images.unsplash.com/photo-1556910096-6f5e72db6803?w=400&h=300&fit=crop",
                "https://www.instacart.com/",
            ),
            Product::new(
                11,
                "Reusable Shopping Bags",
                "Eco-friendly bags that help you save on bag fees and reduce waste.",
                14.99,
                "https://images.unsplash.com/photo-1558618047-3c8c76ca7d13?w=400&h=300&fit=crop",
                "https://www.amazon.com/s?k=reusable+shopping+bags",
            ),
        ];

        let default_bucket = vec![
            Product::new(
                12,
                "Budgeting App Premium",
                "Advanced features to track expenses, set goals, and save more money.",
                4.99,
                "https://images.unsplash.com/photo-1551288049-bebda4e38f71?w=400&h=300&fit=crop",
                "https://www.mint.com/",
            ),
            Product::new(
                13,
                "High-Yield Savings Account",
                "Earn more interest on your savings with competitive APY rates.",
                0.0,
                "https://images.unsplash.com/photo-1579621970563-ebec7560ff3e?w=400&h=300&fit=crop",
                "https://www.bankrate.com/banking/savings/",
            ),
            Product::new(
                14,
                "Investment Platform",
                "Start investing with low fees and automated portfolio management.",
                0.0,
                "https://images.unsplash.com/photo-1460925895917-afdab827c52f?w=400&h=300&fit=crop",
                "https://www.wealthfront.com/",
            ),
            Product::new(
                15,
                "Wireless Earbuds",
                "High-quality audio for work calls and entertainment. Save on replacement cables.",
                79.99,
                "https://images.unsplash.com/photo-1590658268037-6bf12165a8df?w=400&h=300&fit=crop",
                "https://www.amazon.com/s?k=wireless+earbuds",
            ),
            Product::new(
                16,
                "Standing Desk Converter",
                "Improve productivity and health with an adjustable standing desk converter.",
                149.99,
                "https://images.unsplash.com/photo-1524758631624-e2822e304c36?w=400&h=300&fit=crop",
                "https://www.amazon.com/s?k=standing+desk+converter",
            ),
            Product::new(
                17,
                "Fitness Tracker",
                "Monitor your health and activity to reduce medical expenses long-term.",
                99.99,
                "https://images.unsplash.com/photo-1576243345690-4e4b79b63288?w=400&h=300&fit=crop",
                "https://www.amazon.com/s?k=fitness+tracker",
            ),
            Product::new(
                18,
                "Portable Phone Charger",
                "Never run out of battery. Essential for travel and daily use.",
                29.99,
                "https://images.unsplash.com/photo-1609091839311-d5365f5f087a?w=400&h=300&fit=crop",
                "https://www.amazon.com/s?k=portable+phone+charger",
            ),
            Product::new(
                19,
                "Ergonomic Office Chair",
                "Reduce back pain and improve productivity with proper seating.",
                199.99,
                "https://images.unsplash.com/photo-1506439773649-6e0eb8cfb237?w=400&h=300&fit=crop",
                "https://www.amazon.com/s?k=ergonomic+office+chair",
            ),
            Product::new(
                20,
                "Noise Cancelling Headphones",
                "Focus better at work and save on coffee shop expenses.",
                149.99,
                "https://images.unsplash.com/photo-1505740420928-5e560c06d30e?w=400&h=300&fit=crop",
                "https://www.amazon.com/s?k=noise+cancelling+headphones",
            ),
            Product::new(
                21,
                "Meal Planning App Subscription",
                "Plan meals efficiently and reduce food waste.",
                9.99,
                "https://images.unsplash.com/photo-1556910096-6f5e72db6803?w=400&h=300&fit=crop",
                "https://www.mealime.com/",
            ),
            Product::new(
                22,
                "Water Filter Pitcher",
                "Save money on bottled water with clean filtered tap water.",
                34.99,
                "https://images.unsplash.com/photo-1556911220-bff31c812dba?w=400&h=300&fit=crop",
                "https://www.amazon.com/s?k=water+filter+pitcher",
            ),
            Product::new(
                23,
                "Reusable Water Bottle",
                "Eco-friendly and cost-effective alternative to disposable bottles.",
                24.99,
                "https://images.unsplash.com/photo-1602143407151-7111542de6e8?w=400&h=300&fit=crop",
                "https://www.amazon.com/s?k=reusable+water+bottle",
            ),
            Product::new(
                24,
                "Electric Toothbrush",
                "Better oral health reduces dental expenses long-term.",
                49.99,
                "https://images.unsplash.com/photo-1607613009820-a29f7bb81c04?w=400&h=300&fit=crop",
                "https://www.amazon.com/s?k=electric+toothbrush",
            ),
            Product::new(
                25,
                "Slow Cooker",
                "Cook large meals efficiently and save on dining out.",
                39.99,
                "https://images.unsplash.com/photo-1556911220-bff31c812dba?w=400&h=300&fit=crop",
                "https://www.amazon.com/s?k=slow+cooker",
            ),
            Product::new(
                26,
                "Bulk Food Storage Containers",
                "Buy in bulk and save money on groceries.",
                29.99,
                "https://images.unsplash.com/photo-1556910096-6f5e72db6803?w=400&h=300&fit=crop",
                "https://www.amazon.com/s?k=bulk+food+storage",
            ),
            Product::new(
                27,
                "Credit Score Monitoring",
                "Track your credit score for free and improve financial health.",
                0.0,
                "https://images.unsplash.com/photo-1579621970563-ebec7560ff3e?w=400&h=300&fit=crop",
                "https://www.creditkarma.com/",
            ),
            Product::new(
                28,
                "Cashback Credit Card",
                "Earn money back on every purchase you make.",
                0.0,
                "https://images.unsplash.com/photo-1553729459-efe14ef6055d?w=400&h=300&fit=crop",
                "https://www.creditcards.com/cash-back/",
            ),
            Product::new(
                29,
                "Expense Tracking App",
                "Automatically categorize expenses and find savings opportunities.",
                0.0,
                "https://images.unsplash.com/photo-1551288049-bebda4e38f71?w=400&h=300&fit=crop",
                "https://www.youneedabudget.com/",
            ),
            Product::new(
                30,
                "Solar Phone Charger",
                "Charge devices for free using solar power.",
                39.99,
                "https://images.unsplash.com/photo-1609091839311-d5365f5f087a?w=400&h=300&fit=crop",
                "https://www.amazon.com/s?k=solar+phone+charger",
            ),
        ];

        Self {
            buckets: vec![
                ("Food".to_owned(), food),
                ("Travel".to_owned(), travel),
                ("Rent".to_owned(), rent),
                ("Groceries".to_owned(), groceries),
            ],
            default_bucket,
        }
    }

    /// The products for `category`, if it has a dedicated bucket.
    pub fn bucket(&self, category: &str) -> Option<&[Product]> {
        self.buckets
            .iter()
            .find(|(name, _)| name == category)
            .map(|(_, products)| products.as_slice())
    }

    /// The products for `category`, falling back to the `default` bucket.
    pub fn bucket_or_default(&self, category: &str) -> &[Product] {
        self.bucket(category).unwrap_or(&self.default_bucket)
    }

    /// The `default` bucket, always appended to recommendations for
    /// baseline variety.
    pub fn default_bucket(&self) -> &[Product] {
        &self.default_bucket
    }
}
