//! Database repository for account, route, and subscription operations.
//!
//! Uses prepared statements and transactions for data integrity. Registration
//! writes the role record and its profile row as one unit.

use chrono::Utc;
use sqlx::{Row, SqlitePool};

use crate::errors::AppError;
use crate::models::{
    decode_stops, normalize_stops, placeholder_coords, CreateAdminRequest, CreateDriverRequest,
    CreateRouteRequest, CreateStudentRequest, DestinationSummary, Driver, Profile, Role, Route,
    RouteDetail, RouteSubscriber, SchoolAdmin, Stop, StopKind, Student, Subscription,
    SubscriptionStatus, UpdateDriverRequest,
};

/// Database repository for all CRUD operations.
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    // ==================== PROFILE OPERATIONS ====================

    /// Get a profile by ID.
    pub async fn get_profile(&self, id: &str) -> Result<Option<Profile>, AppError> {
        let row = sqlx::query("SELECT id, email, display_name, role, active FROM profiles WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(profile_from_row))
    }

    // ==================== ROUTE OPERATIONS ====================

    /// Register a new route.
    pub async fn create_route(&self, request: &CreateRouteRequest) -> Result<Route, AppError> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();
        let mut stops = request.stops.clone();
        normalize_stops(&mut stops);
        let stops_json = serde_json::to_string(&stops)?;

        sqlx::query(
            r#"INSERT INTO routes (
                id, name, bus_number, plate, shift, driver_name, driver_phone,
                depart_home, arrive_school, depart_school, arrive_home,
                stops, notes, active, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 1, ?)"#,
        )
        .bind(&id)
        .bind(&request.name)
        .bind(&request.bus_number)
        .bind(&request.plate)
        .bind(&request.shift)
        .bind(&request.driver_name)
        .bind(&request.driver_phone)
        .bind(&request.depart_home)
        .bind(&request.arrive_school)
        .bind(&request.depart_school)
        .bind(&request.arrive_home)
        .bind(&stops_json)
        .bind(&request.notes)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        Ok(Route {
            id,
            name: request.name.clone(),
            bus_number: request.bus_number.clone(),
            plate: request.plate.clone(),
            shift: request.shift.clone(),
            driver_name: request.driver_name.clone(),
            driver_phone: request.driver_phone.clone(),
            depart_home: request.depart_home.clone(),
            arrive_school: request.arrive_school.clone(),
            depart_school: request.depart_school.clone(),
            arrive_home: request.arrive_home.clone(),
            stops,
            notes: request.notes.clone(),
            active: true,
            created_at: now,
        })
    }

    /// List all routes, stop lists decoded to structured form.
    pub async fn list_routes(&self) -> Result<Vec<Route>, AppError> {
        let rows = sqlx::query(
            r#"SELECT id, name, bus_number, plate, shift, driver_name, driver_phone,
                      depart_home, arrive_school, depart_school, arrive_home,
                      stops, notes, active, created_at
               FROM routes ORDER BY name"#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(route_from_row).collect())
    }

    /// Get a route by ID.
    pub async fn get_route(&self, id: &str) -> Result<Option<Route>, AppError> {
        let row = sqlx::query(
            r#"SELECT id, name, bus_number, plate, shift, driver_name, driver_phone,
                      depart_home, arrive_school, depart_school, arrive_home,
                      stops, notes, active, created_at
               FROM routes WHERE id = ?"#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(route_from_row))
    }

    /// Student-facing route detail: appends the student's school as a
    /// destination stop (with placeholder coordinates) when it is not
    /// already on the list, then re-tags and renumbers the stops.
    pub async fn route_detail(
        &self,
        route_id: &str,
        student_id: &str,
    ) -> Result<RouteDetail, AppError> {
        let mut route = self
            .get_route(route_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Route {} not found", route_id)))?;

        let school: Option<String> = sqlx::query("SELECT school FROM students WHERE id = ?")
            .bind(student_id)
            .fetch_optional(&self.pool)
            .await?
            .map(|row| row.get("school"));

        if let Some(school) = school {
            if !route.stops.iter().any(|s| s.name == school) {
                let (latitude, longitude) = placeholder_coords(&school);
                route.stops.push(Stop {
                    id: 0,
                    name: school,
                    latitude: Some(latitude),
                    longitude: Some(longitude),
                    time: None,
                    kind: Some(StopKind::Destination),
                });
            }
        }

        normalize_stops(&mut route.stops);

        let destination = match route.stops.last() {
            Some(last) => DestinationSummary {
                name: Some(last.name.clone()),
                latitude: last.latitude,
                longitude: last.longitude,
            },
            None => DestinationSummary {
                name: None,
                latitude: None,
                longitude: None,
            },
        };

        Ok(RouteDetail { route, destination })
    }

    // ==================== STUDENT OPERATIONS ====================

    /// Register a new student together with its profile row.
    pub async fn create_student(
        &self,
        request: &CreateStudentRequest,
        password_hash: &str,
    ) -> Result<Student, AppError> {
        let id = uuid::Uuid::new_v4().to_string();
        let profile_id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO profiles (id, email, display_name, role, active) VALUES (?, ?, ?, ?, 1)",
        )
        .bind(&profile_id)
        .bind(&request.email)
        .bind(&request.full_name)
        .bind(Role::Student.as_str())
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"INSERT INTO students (
                id, full_name, school, class_name, email, enrollment_number,
                guardian_name, guardian_phone, password_hash, profile_id, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(&id)
        .bind(&request.full_name)
        .bind(&request.school)
        .bind(&request.class)
        .bind(&request.email)
        .bind(&request.enrollment_number)
        .bind(&request.guardian_name)
        .bind(&request.guardian_phone)
        .bind(password_hash)
        .bind(&profile_id)
        .bind(&now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(Student {
            id,
            full_name: request.full_name.clone(),
            school: request.school.clone(),
            class: request.class.clone(),
            email: request.email.clone(),
            enrollment_number: request.enrollment_number.clone(),
            guardian_name: request.guardian_name.clone(),
            guardian_phone: request.guardian_phone.clone(),
            profile_id,
            created_at: now,
        })
    }

    /// List all students.
    pub async fn list_students(&self) -> Result<Vec<Student>, AppError> {
        let rows = sqlx::query(
            r#"SELECT id, full_name, school, class_name, email, enrollment_number,
                      guardian_name, guardian_phone, profile_id, created_at
               FROM students ORDER BY full_name"#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(student_from_row).collect())
    }

    /// Look up a student and its password hash by email, for login.
    pub async fn student_by_email(
        &self,
        email: &str,
    ) -> Result<Option<(Student, String)>, AppError> {
        let row = sqlx::query(
            r#"SELECT id, full_name, school, class_name, email, enrollment_number,
                      guardian_name, guardian_phone, password_hash, profile_id, created_at
               FROM students WHERE email = ?"#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| {
            let hash: String = row.get("password_hash");
            (student_from_row(&row), hash)
        }))
    }

    // ==================== DRIVER OPERATIONS ====================

    /// Register a new driver together with its profile row.
    pub async fn create_driver(
        &self,
        request: &CreateDriverRequest,
        password_hash: &str,
    ) -> Result<Driver, AppError> {
        let id = uuid::Uuid::new_v4().to_string();
        let profile_id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO profiles (id, email, display_name, role, active) VALUES (?, ?, ?, ?, 1)",
        )
        .bind(&profile_id)
        .bind(&request.email)
        .bind(&request.full_name)
        .bind(Role::Driver.as_str())
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"INSERT INTO drivers (
                id, full_name, email, phone, password_hash, license_number,
                license_expiry, bus_plate, bus_model, route_ref, profile_id, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(&id)
        .bind(&request.full_name)
        .bind(&request.email)
        .bind(&request.phone)
        .bind(password_hash)
        .bind(&request.license_number)
        .bind(&request.license_expiry)
        .bind(&request.bus_plate)
        .bind(&request.bus_model)
        .bind(&request.route_ref)
        .bind(&profile_id)
        .bind(&now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(Driver {
            id,
            full_name: request.full_name.clone(),
            email: request.email.clone(),
            phone: request.phone.clone(),
            license_number: request.license_number.clone(),
            license_expiry: request.license_expiry.clone(),
            bus_plate: request.bus_plate.clone(),
            bus_model: request.bus_model.clone(),
            route_ref: request.route_ref.clone(),
            profile_id,
            active: true,
            created_at: now,
        })
    }

    /// List all drivers, active flag taken from the linked profile.
    pub async fn list_drivers(&self) -> Result<Vec<Driver>, AppError> {
        let rows = sqlx::query(
            r#"SELECT d.id, d.full_name, d.email, d.phone, d.license_number,
                      d.license_expiry, d.bus_plate, d.bus_model, d.route_ref,
                      d.profile_id, d.created_at, p.active
               FROM drivers d JOIN profiles p ON p.id = d.profile_id
               ORDER BY d.full_name"#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(driver_from_row).collect())
    }

    /// Get a driver by ID.
    pub async fn get_driver(&self, id: &str) -> Result<Option<Driver>, AppError> {
        let row = sqlx::query(
            r#"SELECT d.id, d.full_name, d.email, d.phone, d.license_number,
                      d.license_expiry, d.bus_plate, d.bus_model, d.route_ref,
                      d.profile_id, d.created_at, p.active
               FROM drivers d JOIN profiles p ON p.id = d.profile_id
               WHERE d.id = ?"#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(driver_from_row))
    }

    /// Partially update a driver, keeping the linked profile in sync.
    pub async fn update_driver(
        &self,
        id: &str,
        request: &UpdateDriverRequest,
        new_password_hash: Option<&str>,
    ) -> Result<Driver, AppError> {
        let existing = self
            .get_driver(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Driver {} not found", id)))?;

        let full_name = request.full_name.as_ref().unwrap_or(&existing.full_name);
        let email = request.email.as_ref().unwrap_or(&existing.email);
        let phone = request.phone.clone().or(existing.phone.clone());
        let license_number = request
            .license_number
            .clone()
            .or(existing.license_number.clone());
        let license_expiry = request
            .license_expiry
            .clone()
            .or(existing.license_expiry.clone());
        let bus_plate = request.bus_plate.clone().or(existing.bus_plate.clone());
        let bus_model = request.bus_model.clone().or(existing.bus_model.clone());
        let route_ref = request.route_ref.clone().or(existing.route_ref.clone());
        let active = request.active.unwrap_or(existing.active);

        let mut tx = self.pool.begin().await?;

        if let Some(hash) = new_password_hash {
            sqlx::query("UPDATE drivers SET password_hash = ? WHERE id = ?")
                .bind(hash)
                .bind(id)
                .execute(&mut *tx)
                .await?;
        }

        sqlx::query(
            r#"UPDATE drivers SET
                full_name = ?, email = ?, phone = ?, license_number = ?,
                license_expiry = ?, bus_plate = ?, bus_model = ?, route_ref = ?
            WHERE id = ?"#,
        )
        .bind(full_name)
        .bind(email)
        .bind(&phone)
        .bind(&license_number)
        .bind(&license_expiry)
        .bind(&bus_plate)
        .bind(&bus_model)
        .bind(&route_ref)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        sqlx::query("UPDATE profiles SET email = ?, display_name = ?, active = ? WHERE id = ?")
            .bind(email)
            .bind(full_name)
            .bind(active as i32)
            .bind(&existing.profile_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(Driver {
            id: id.to_string(),
            full_name: full_name.clone(),
            email: email.clone(),
            phone,
            license_number,
            license_expiry,
            bus_plate,
            bus_model,
            route_ref,
            profile_id: existing.profile_id,
            active,
            created_at: existing.created_at,
        })
    }

    /// Look up a driver and its password hash by email, for login.
    pub async fn driver_by_email(&self, email: &str) -> Result<Option<(Driver, String)>, AppError> {
        let row = sqlx::query(
            r#"SELECT d.id, d.full_name, d.email, d.phone, d.license_number,
                      d.license_expiry, d.bus_plate, d.bus_model, d.route_ref,
                      d.profile_id, d.created_at, d.password_hash, p.active
               FROM drivers d JOIN profiles p ON p.id = d.profile_id
               WHERE d.email = ?"#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| {
            let hash: String = row.get("password_hash");
            (driver_from_row(&row), hash)
        }))
    }

    // ==================== ADMIN OPERATIONS ====================

    /// Register a new school administration together with its profile row.
    pub async fn create_admin(
        &self,
        request: &CreateAdminRequest,
        password_hash: &str,
    ) -> Result<SchoolAdmin, AppError> {
        let id = uuid::Uuid::new_v4().to_string();
        let profile_id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO profiles (id, email, display_name, role, active) VALUES (?, ?, ?, ?, 1)",
        )
        .bind(&profile_id)
        .bind(&request.email)
        .bind(&request.manager_name)
        .bind(Role::Admin.as_str())
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"INSERT INTO admins (
                id, school_name, address, latitude, longitude, school_contact,
                manager_name, position, email, phone, password_hash, profile_id, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(&id)
        .bind(&request.school_name)
        .bind(&request.address)
        .bind(request.latitude)
        .bind(request.longitude)
        .bind(&request.school_contact)
        .bind(&request.manager_name)
        .bind(&request.position)
        .bind(&request.email)
        .bind(&request.phone)
        .bind(password_hash)
        .bind(&profile_id)
        .bind(&now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(SchoolAdmin {
            id,
            school_name: request.school_name.clone(),
            address: request.address.clone(),
            latitude: request.latitude,
            longitude: request.longitude,
            school_contact: request.school_contact.clone(),
            manager_name: request.manager_name.clone(),
            position: request.position.clone(),
            email: request.email.clone(),
            phone: request.phone.clone(),
            profile_id,
            created_at: now,
        })
    }

    /// List all school administrations.
    pub async fn list_admins(&self) -> Result<Vec<SchoolAdmin>, AppError> {
        let rows = sqlx::query(
            r#"SELECT id, school_name, address, latitude, longitude, school_contact,
                      manager_name, position, email, phone, profile_id, created_at
               FROM admins ORDER BY school_name"#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(admin_from_row).collect())
    }

    /// Look up an administration and its password hash by email, for login.
    pub async fn admin_by_email(
        &self,
        email: &str,
    ) -> Result<Option<(SchoolAdmin, String)>, AppError> {
        let row = sqlx::query(
            r#"SELECT id, school_name, address, latitude, longitude, school_contact,
                      manager_name, position, email, phone, password_hash, profile_id, created_at
               FROM admins WHERE email = ?"#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| {
            let hash: String = row.get("password_hash");
            (admin_from_row(&row), hash)
        }))
    }

    // ==================== SUBSCRIPTION OPERATIONS ====================

    /// Enroll a student in a route.
    ///
    /// The pre-check gives a friendly message; the partial unique index on
    /// active rows is what actually closes the concurrent-enroll race.
    pub async fn enroll(&self, student_id: &str, route_id: &str) -> Result<Subscription, AppError> {
        let existing = sqlx::query(
            "SELECT id FROM subscriptions WHERE student_id = ? AND route_id = ? AND status = 'active'",
        )
        .bind(student_id)
        .bind(route_id)
        .fetch_optional(&self.pool)
        .await?;

        if existing.is_some() {
            return Err(AppError::Conflict(
                "Student already has an active subscription to this route".to_string(),
            ));
        }

        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            "INSERT INTO subscriptions (id, student_id, route_id, status, created_at) VALUES (?, ?, ?, 'active', ?)",
        )
        .bind(&id)
        .bind(student_id)
        .bind(route_id)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        Ok(Subscription {
            id,
            student_id: student_id.to_string(),
            route_id: route_id.to_string(),
            status: SubscriptionStatus::Active,
            created_at: now,
        })
    }

    /// Cancel a student's active subscription to a route. No-op when none exists.
    pub async fn unenroll(&self, student_id: &str, route_id: &str) -> Result<(), AppError> {
        sqlx::query(
            "UPDATE subscriptions SET status = 'cancelled' WHERE student_id = ? AND route_id = ? AND status = 'active'",
        )
        .bind(student_id)
        .bind(route_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Students with an active subscription to a route.
    pub async fn subscribers_by_route(
        &self,
        route_id: &str,
    ) -> Result<Vec<RouteSubscriber>, AppError> {
        let rows = sqlx::query(
            r#"SELECT s.id, s.full_name, s.school, s.class_name, s.enrollment_number
               FROM subscriptions sub
               JOIN students s ON s.id = sub.student_id
               WHERE sub.route_id = ? AND sub.status = 'active'
               ORDER BY s.full_name"#,
        )
        .bind(route_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| RouteSubscriber {
                id: row.get("id"),
                full_name: row.get("full_name"),
                school: row.get("school"),
                class: row.get("class_name"),
                enrollment_number: row.get("enrollment_number"),
            })
            .collect())
    }

    /// Routes a student is actively subscribed to, stops decoded.
    pub async fn routes_by_student(&self, student_id: &str) -> Result<Vec<Route>, AppError> {
        let rows = sqlx::query(
            r#"SELECT r.id, r.name, r.bus_number, r.plate, r.shift, r.driver_name,
                      r.driver_phone, r.depart_home, r.arrive_school, r.depart_school,
                      r.arrive_home, r.stops, r.notes, r.active, r.created_at
               FROM subscriptions sub
               JOIN routes r ON r.id = sub.route_id
               WHERE sub.student_id = ? AND sub.status = 'active'
               ORDER BY r.name"#,
        )
        .bind(student_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(route_from_row).collect())
    }
}

// Helper functions for row conversion

fn profile_from_row(row: &sqlx::sqlite::SqliteRow) -> Profile {
    let active: i32 = row.get("active");
    let role: String = row.get("role");
    Profile {
        id: row.get("id"),
        email: row.get("email"),
        display_name: row.get("display_name"),
        role: Role::from_str(&role).unwrap_or(Role::Student),
        active: active != 0,
    }
}

fn route_from_row(row: &sqlx::sqlite::SqliteRow) -> Route {
    let active: i32 = row.get("active");
    let stops_raw: Option<String> = row.get("stops");
    let mut stops = decode_stops(stops_raw.as_deref());
    normalize_stops(&mut stops);

    Route {
        id: row.get("id"),
        name: row.get("name"),
        bus_number: row.get("bus_number"),
        plate: row.get("plate"),
        shift: row.get("shift"),
        driver_name: row.get("driver_name"),
        driver_phone: row.get("driver_phone"),
        depart_home: row.get("depart_home"),
        arrive_school: row.get("arrive_school"),
        depart_school: row.get("depart_school"),
        arrive_home: row.get("arrive_home"),
        stops,
        notes: row.get("notes"),
        active: active != 0,
        created_at: row.get("created_at"),
    }
}

fn student_from_row(row: &sqlx::sqlite::SqliteRow) -> Student {
    Student {
        id: row.get("id"),
        full_name: row.get("full_name"),
        school: row.get("school"),
        class: row.get("class_name"),
        email: row.get("email"),
        enrollment_number: row.get("enrollment_number"),
        guardian_name: row.get("guardian_name"),
        guardian_phone: row.get("guardian_phone"),
        profile_id: row.get("profile_id"),
        created_at: row.get("created_at"),
    }
}

fn driver_from_row(row: &sqlx::sqlite::SqliteRow) -> Driver {
    let active: i32 = row.get("active");
    Driver {
        id: row.get("id"),
        full_name: row.get("full_name"),
        email: row.get("email"),
        phone: row.get("phone"),
        license_number: row.get("license_number"),
        license_expiry: row.get("license_expiry"),
        bus_plate: row.get("bus_plate"),
        bus_model: row.get("bus_model"),
        route_ref: row.get("route_ref"),
        profile_id: row.get("profile_id"),
        active: active != 0,
        created_at: row.get("created_at"),
    }
}

fn admin_from_row(row: &sqlx::sqlite::SqliteRow) -> SchoolAdmin {
    SchoolAdmin {
        id: row.get("id"),
        school_name: row.get("school_name"),
        address: row.get("address"),
        latitude: row.get("latitude"),
        longitude: row.get("longitude"),
        school_contact: row.get("school_contact"),
        manager_name: row.get("manager_name"),
        position: row.get("position"),
        email: row.get("email"),
        phone: row.get("phone"),
        profile_id: row.get("profile_id"),
        created_at: row.get("created_at"),
    }
}
