//! Response bodies shaped like the backend's list endpoints.

use serde_json::{json, Value};

/// Unpaginated tickets: two pending, one completed, no server stats.
pub fn tickets_unpaginated() -> Value {
    json!({
        "tickets": [
            {"_id": "t1", "customerName": "Ava Stone", "customerEmail": "ava@example.com",
             "packageName": "Family", "status": "pending", "amount": 5,
             "purchasedAt": "2024-03-09T10:00:00Z"},
            {"_id": "t2", "customerName": "Ben Ortiz", "customerEmail": "ben@example.com",
             "packageName": "Single", "status": "pending", "amount": 5,
             "purchasedAt": "2024-09-14T18:30:00Z"},
            {"_id": "t3", "customerName": "Cleo Park", "customerEmail": "cleo@example.com",
             "packageName": "Single", "status": "completed", "amount": 5,
             "purchasedAt": "2024-12-01T12:00:00Z"}
        ]
    })
}

/// One server-paginated ticket page with server-computed stats.
pub fn tickets_page(ids: &[&str], page: u32, total: u64) -> Value {
    let tickets: Vec<Value> = ids
        .iter()
        .map(|id| {
            json!({
                "_id": id,
                "customerName": format!("Customer {}", id),
                "customerEmail": format!("{}@example.com", id),
                "status": "completed",
                "amount": 25.0,
                "purchasedAt": "2024-06-01T09:00:00Z"
            })
        })
        .collect();
    json!({
        "tickets": tickets,
        "pagination": {"page": page, "limit": 25, "total": total, "totalPages": total.div_ceil(25)},
        "stats": {"totalRevenue": 25.0 * total as f64, "totalTickets": total,
                  "uniqueCustomers": total, "averageTicketPrice": 25.0}
    })
}

pub fn teams() -> Value {
    json!({
        "teams": [
            {"_id": "tm1", "teamName": "Hawks", "grade": "5th", "gender": "Girls",
             "coachName": "Dana Reyes", "tournamentName": "Spring Classic", "season": "Spring",
             "year": 2024, "players": [{"name": "A"}, {"name": "B"}]},
            {"_id": "tm2", "teamName": "Owls", "grade": "6th", "gender": "Boys",
             "coachName": "Lee Chan", "tournamentName": "Fall Frenzy", "playerCount": 9,
             "createdAt": "2024-09-02T00:00:00Z"}
        ]
    })
}

pub fn registrations() -> Value {
    json!({
        "registrations": [
            {"_id": "r1", "teamName": "Hawks", "tournamentName": "Spring Classic",
             "parentName": "Pat Stone", "parentEmail": "PAT@example.com",
             "amountPaid": 150, "paymentStatus": "paid", "createdAt": "2024-02-20T00:00:00Z"},
            {"_id": "r2", "teamName": "Owls", "tournamentName": "Spring Classic",
             "parentName": "Pat Stone", "parentEmail": "pat@example.com",
             "amountPaid": 150, "paymentStatus": "pending", "createdAt": "2024-02-21T00:00:00Z"}
        ]
    })
}

/// One pending and one already processed refund.
pub fn refunds() -> Value {
    json!({
        "refunds": [
            {"_id": "rf1", "ticketId": "t2", "customerName": "Ben Ortiz",
             "customerEmail": "ben@example.com", "amount": 5, "reason": "Schedule conflict",
             "status": "pending", "requestedAt": "2024-09-20T00:00:00Z"},
            {"_id": "rf2", "ticketId": "t9", "customerName": "Cleo Park",
             "customerEmail": "cleo@example.com", "amount": 12.5, "reason": "Duplicate",
             "status": "processed", "requestedAt": "2024-08-01T00:00:00Z",
             "processedAt": "2024-08-03T00:00:00Z"}
        ]
    })
}
